use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::core::plugin::settings::apply_defaults;
use crate::core::plugin::{DatasourceDefinition, DatasourcePlugin, InstanceCallback};
use crate::core::ports::emitter::EmitterPort;
use crate::core::ports::host::HostPort;
use crate::error::{PluginError, PluginResult};

/// Most recent emission of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub value: Value,
    pub last_updated: String,
    /// Emissions received so far, this one included.
    pub count: u64,
}

struct RegisteredPlugin {
    descriptor: Value,
    definition: DatasourceDefinition,
}

struct HostedInstance {
    type_name: String,
    plugin: Box<dyn DatasourcePlugin>,
    latest: Arc<Mutex<Option<Update>>>,
}

struct InstanceSink {
    instance_id: String,
    latest: Arc<Mutex<Option<Update>>>,
    listener: Option<Arc<dyn EmitterPort>>,
}

impl EmitterPort for InstanceSink {
    fn emit(&self, payload: &Value) {
        {
            let mut latest = lock(&self.latest);
            let count = latest.as_ref().map_or(0, |update| update.count) + 1;
            *latest = Some(Update {
                value: payload.clone(),
                last_updated: chrono::Utc::now().to_rfc3339(),
                count,
            });
        }
        log::debug!("Datasource {} updated: {}", self.instance_id, payload);
        if let Some(listener) = &self.listener {
            listener.emit(payload);
        }
    }
}

/// In-process stand-in for the dashboard: keeps registered plugin types and
/// the instances created from them.
#[derive(Default)]
pub struct LocalHost {
    plugins: HashMap<String, RegisteredPlugin>,
    order: Vec<String>,
    instances: HashMap<String, HostedInstance>,
    listener: Option<Arc<dyn EmitterPort>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every emission of every instance is also forwarded to `listener`.
    pub fn with_listener(mut self, listener: Arc<dyn EmitterPort>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Registered type names, in registration order.
    pub fn plugin_types(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&Value> {
        self.plugins
            .get(type_name)
            .map(|registered| &registered.descriptor)
    }

    pub fn create_instance(&mut self, type_name: &str, settings: Value) -> PluginResult<String> {
        let registered = self
            .plugins
            .get(type_name)
            .ok_or_else(|| PluginError::UnknownPlugin(type_name.to_string()))?;

        let settings = apply_defaults(&registered.definition.settings, settings);
        let instance_id = uuid::Uuid::new_v4().to_string();
        let latest = Arc::new(Mutex::new(None));
        let sink: Arc<dyn EmitterPort> = Arc::new(InstanceSink {
            instance_id: instance_id.clone(),
            latest: Arc::clone(&latest),
            listener: self.listener.clone(),
        });

        let slot: Arc<Mutex<Option<Box<dyn DatasourcePlugin>>>> = Arc::new(Mutex::new(None));
        let callback: InstanceCallback = {
            let slot = Arc::clone(&slot);
            Box::new(move |plugin: Box<dyn DatasourcePlugin>| {
                *lock(&slot) = Some(plugin);
            })
        };

        (registered.definition.new_instance)(settings, callback, sink)?;

        let plugin = lock(&slot)
            .take()
            .ok_or_else(|| PluginError::NoInstance(type_name.to_string()))?;

        self.instances.insert(
            instance_id.clone(),
            HostedInstance {
                type_name: type_name.to_string(),
                plugin,
                latest,
            },
        );
        log::info!("Created datasource {} of type '{}'", instance_id, type_name);
        Ok(instance_id)
    }

    pub fn update_settings(&mut self, instance_id: &str, settings: Value) -> PluginResult<()> {
        let Self {
            plugins, instances, ..
        } = self;
        let instance = instances
            .get_mut(instance_id)
            .ok_or_else(|| PluginError::UnknownInstance(instance_id.to_string()))?;

        let settings = match plugins.get(&instance.type_name) {
            Some(registered) => apply_defaults(&registered.definition.settings, settings),
            None => settings,
        };
        instance.plugin.on_settings_changed(settings)?;
        log::info!("Applied new settings to datasource {}", instance_id);
        Ok(())
    }

    /// Manual refresh, as triggered from the dashboard UI.
    pub fn refresh(&mut self, instance_id: &str) -> PluginResult<()> {
        let instance = self
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| PluginError::UnknownInstance(instance_id.to_string()))?;
        instance.plugin.update_now();
        Ok(())
    }

    pub fn dispose(&mut self, instance_id: &str) -> PluginResult<()> {
        let mut instance = self
            .instances
            .remove(instance_id)
            .ok_or_else(|| PluginError::UnknownInstance(instance_id.to_string()))?;
        instance.plugin.on_dispose();
        log::info!("Disposed datasource {}", instance_id);
        Ok(())
    }

    pub fn dispose_all(&mut self) {
        for (instance_id, mut instance) in self.instances.drain() {
            instance.plugin.on_dispose();
            log::debug!("Disposed datasource {}", instance_id);
        }
    }

    pub fn latest(&self, instance_id: &str) -> Option<Update> {
        self.instances
            .get(instance_id)
            .and_then(|instance| lock(&instance.latest).clone())
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl HostPort for LocalHost {
    fn load_datasource_plugin(&mut self, definition: DatasourceDefinition) -> PluginResult<()> {
        if self.plugins.contains_key(&definition.type_name) {
            return Err(PluginError::DuplicatePlugin(definition.type_name));
        }
        let descriptor = definition.to_host_value()?;
        let type_name = definition.type_name.clone();
        self.order.push(type_name.clone());
        self.plugins.insert(
            type_name,
            RegisteredPlugin {
                descriptor,
                definition,
            },
        );
        Ok(())
    }
}

impl Drop for LocalHost {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
