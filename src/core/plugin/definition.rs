use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::core::ports::emitter::EmitterPort;
use crate::error::{PluginError, PluginResult};

use super::settings::{is_js_identifier, settings_to_host_value, SettingDefinition};
use super::DatasourcePlugin;

/// Hands a freshly built instance back to the host.
pub type InstanceCallback = Box<dyn FnOnce(Box<dyn DatasourcePlugin>) + Send>;

/// `new_instance(settings, instance_callback, update)`.
///
/// The factory receives the host's settings object (defaults already filled
/// in), builds the plugin, passes it to `instance_callback` and keeps `update`
/// for its emissions.
pub type NewInstanceFn = dyn Fn(Value, InstanceCallback, Arc<dyn EmitterPort>) -> PluginResult<()>
    + Send
    + Sync;

#[derive(Clone)]
pub struct DatasourceDefinition {
    /// Unique, must be a valid JavaScript identifier.
    pub type_name: String,
    pub display_name: String,
    pub description: String,
    /// Script URIs the host loads before the plugin.
    pub external_scripts: Vec<String>,
    pub settings: Vec<SettingDefinition>,
    pub new_instance: Arc<NewInstanceFn>,
}

impl DatasourceDefinition {
    /// The registration object without the factory.
    pub fn to_host_value(&self) -> PluginResult<Value> {
        if !is_js_identifier(&self.type_name) {
            return Err(PluginError::InvalidName {
                kind: "type",
                name: self.type_name.clone(),
            });
        }

        let mut output = Map::new();
        output.insert("type_name".to_string(), json!(self.type_name));
        output.insert("display_name".to_string(), json!(self.display_name));
        output.insert("description".to_string(), json!(self.description));
        if !self.external_scripts.is_empty() {
            output.insert("external_scripts".to_string(), json!(self.external_scripts));
        }
        output.insert(
            "settings".to_string(),
            Value::Array(settings_to_host_value(&self.settings)?),
        );
        Ok(Value::Object(output))
    }
}

impl fmt::Debug for DatasourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasourceDefinition")
            .field("type_name", &self.type_name)
            .field("display_name", &self.display_name)
            .field("external_scripts", &self.external_scripts)
            .field("settings", &self.settings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plugin::{DefaultValue, SettingType};

    fn unused_factory(
        _settings: Value,
        _instance: InstanceCallback,
        _update: Arc<dyn EmitterPort>,
    ) -> PluginResult<()> {
        Ok(())
    }

    fn definition(type_name: &str) -> DatasourceDefinition {
        DatasourceDefinition {
            type_name: type_name.to_string(),
            display_name: "test plugin".to_string(),
            description: "This is a test plugin".to_string(),
            external_scripts: Vec::new(),
            settings: vec![SettingDefinition::new("datatext", "Data Text", SettingType::Text)
                .default_value(DefaultValue::Text("Foobar".to_string()))],
            new_instance: Arc::new(unused_factory),
        }
    }

    #[test]
    fn descriptor_carries_metadata_and_settings() {
        let value = definition("testplugin").to_host_value().expect("descriptor");
        assert_eq!(value["type_name"], json!("testplugin"));
        assert_eq!(value["display_name"], json!("test plugin"));
        assert_eq!(value["settings"][0]["default_value"], json!("Foobar"));
        assert!(value.get("newInstance").is_none());
    }

    #[test]
    fn empty_external_scripts_are_left_out() {
        let value = definition("testplugin").to_host_value().expect("descriptor");
        assert!(value.get("external_scripts").is_none());

        let mut with_scripts = definition("testplugin");
        with_scripts.external_scripts = vec!["https://cdn.example.com/lib.js".to_string()];
        let value = with_scripts.to_host_value().expect("descriptor");
        assert_eq!(
            value["external_scripts"],
            json!(["https://cdn.example.com/lib.js"])
        );
    }

    #[test]
    fn type_name_must_be_an_identifier() {
        let error = definition("test-plugin")
            .to_host_value()
            .expect_err("dash in type name");
        assert!(matches!(error, PluginError::InvalidName { kind: "type", .. }));
    }
}
