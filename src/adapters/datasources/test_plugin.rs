use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::plugin::settings::{lenient_number, parse_settings};
use crate::core::plugin::{
    DatasourceDefinition, DatasourcePlugin, DefaultValue, InstanceCallback, PeriodicSource,
    SettingDefinition, SettingType,
};
use crate::core::ports::emitter::EmitterPort;
use crate::error::PluginResult;

pub const TYPE_NAME: &str = "testplugin";

const ANIMAL: &str = "dinosaur";
const DEFAULT_DATATEXT: &str = "Foobar";
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(5);
/// Longest refresh accepted from the host: one day.
pub const MAX_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TestSettings {
    pub datatext: String,
    /// Seconds between emissions.
    #[serde(deserialize_with = "lenient_number")]
    pub refresh: Option<f64>,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            datatext: DEFAULT_DATATEXT.to_string(),
            refresh: None,
        }
    }
}

impl TestSettings {
    pub fn refresh_period(&self) -> Duration {
        let Some(seconds) = self.refresh else {
            return DEFAULT_REFRESH;
        };
        match Duration::try_from_secs_f64(seconds) {
            Ok(period) if !period.is_zero() && period <= MAX_REFRESH => period,
            _ => {
                log::warn!(
                    "Unusable refresh of {} seconds, falling back to {:?}",
                    seconds,
                    DEFAULT_REFRESH
                );
                DEFAULT_REFRESH
            }
        }
    }
}

fn render(settings: &TestSettings) -> Value {
    json!({
        "datatext": settings.datatext,
        "animal": ANIMAL,
    })
}

/// Emits `{datatext, animal: "dinosaur"}` every refresh period.
pub struct TestPlugin {
    source: PeriodicSource<TestSettings>,
}

impl TestPlugin {
    /// Starts ticking at the default period; `settings.refresh` only applies on change.
    pub fn new(settings: TestSettings, update: Arc<dyn EmitterPort>) -> PluginResult<Self> {
        let source = PeriodicSource::start(settings, render, update, DEFAULT_REFRESH)?;
        Ok(Self { source })
    }

    pub fn settings(&self) -> TestSettings {
        self.source.settings()
    }

    pub fn period(&self) -> Option<Duration> {
        self.source.period()
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }
}

impl DatasourcePlugin for TestPlugin {
    fn on_settings_changed(&mut self, settings: Value) -> PluginResult<()> {
        let settings: TestSettings = parse_settings(TYPE_NAME, settings)?;
        let period = settings.refresh_period();
        self.source.reconfigure(settings, period)?;
        self.source.emit_now();
        Ok(())
    }

    fn update_now(&mut self) {
        self.source.emit_now();
    }

    fn on_dispose(&mut self) {
        self.source.dispose();
    }
}

fn new_instance(
    settings: Value,
    instance: InstanceCallback,
    update: Arc<dyn EmitterPort>,
) -> PluginResult<()> {
    let settings: TestSettings = parse_settings(TYPE_NAME, settings)?;
    let plugin = TestPlugin::new(settings, update)?;
    instance(Box::new(plugin));
    Ok(())
}

pub fn definition() -> DatasourceDefinition {
    DatasourceDefinition {
        type_name: TYPE_NAME.to_string(),
        display_name: "test plugin".to_string(),
        description: "This is a test plugin".to_string(),
        external_scripts: Vec::new(),
        settings: vec![
            SettingDefinition::new("datatext", "Data Text", SettingType::Text)
                .description("Text to provide as data.")
                .default_value(DefaultValue::Text(DEFAULT_DATATEXT.to_string())),
            SettingDefinition::new("refresh", "Refresh Every", SettingType::Number)
                .description("Seconds between updates.")
                .default_value(DefaultValue::Integer(5)),
        ],
        new_instance: Arc::new(new_instance),
    }
}
