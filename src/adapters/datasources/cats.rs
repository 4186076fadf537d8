use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::plugin::settings::{lenient_number, parse_settings};
use crate::core::plugin::{
    DatasourceDefinition, DatasourcePlugin, DefaultValue, InstanceCallback, PeriodicSource,
    SettingDefinition, SettingOption, SettingType, SubSetting,
};
use crate::core::ports::emitter::EmitterPort;
use crate::error::PluginResult;

pub const TYPE_NAME: &str = "catsplugin";

const TICK: Duration = Duration::from_secs(5);
const ANIMALS: [&str; 4] = ["Tiger", "Lion", "Tigon", "Liger"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatsSettings {
    pub catname: String,
    pub animal: Option<String>,
    pub refine: Vec<CatPreference>,
}

impl Default for CatsSettings {
    fn default() -> Self {
        Self {
            catname: "Meow".to_string(),
            animal: None,
            refine: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatPreference {
    #[serde(deserialize_with = "lenient_number")]
    pub preferred_number: Option<f64>,
    pub preferred_colour: Option<String>,
}

fn render(settings: &CatsSettings) -> Value {
    let refine: Vec<Value> = settings
        .refine
        .iter()
        .map(|row| {
            json!({
                "preferred_number": row.preferred_number,
                "preferred_colour": row.preferred_colour,
            })
        })
        .collect();

    json!({
        "catname": settings.catname,
        "animal": settings.animal,
        "refine": refine,
    })
}

/// Echoes its cat preferences back to the dashboard.
pub struct CatsPlugin {
    source: PeriodicSource<CatsSettings>,
}

impl CatsPlugin {
    pub fn new(settings: CatsSettings, update: Arc<dyn EmitterPort>) -> PluginResult<Self> {
        let source = PeriodicSource::start(settings, render, update, TICK)?;
        Ok(Self { source })
    }
}

impl DatasourcePlugin for CatsPlugin {
    fn on_settings_changed(&mut self, settings: Value) -> PluginResult<()> {
        let settings: CatsSettings = parse_settings(TYPE_NAME, settings)?;
        self.source.replace_settings(settings)?;
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
    let settings: CatsSettings = parse_settings(TYPE_NAME, settings)?;
    instance(Box::new(CatsPlugin::new(settings, update)?));
    Ok(())
}

pub fn definition() -> DatasourceDefinition {
    let animal = ANIMALS.iter().fold(
        SettingDefinition::new("animal", "Animal", SettingType::Option)
            .description("Favourite animal."),
        |setting, name| setting.option(SettingOption::new(*name)),
    );

    DatasourceDefinition {
        type_name: TYPE_NAME.to_string(),
        display_name: "Cats".to_string(),
        description: "A demo plugin about cats".to_string(),
        external_scripts: Vec::new(),
        settings: vec![
            SettingDefinition::new("catname", "Favourite Cat Name", SettingType::Text)
                .description("What would you call your favourite cat?")
                .default_value(DefaultValue::Text("Meow".to_string())),
            animal,
            SettingDefinition::new("refine", "Refined Animal Preference", SettingType::Array)
                .description("More details on what kinda cat you like")
                .row_field(SubSetting::new(
                    "preferred_number",
                    "Preferred number per cage",
                    SettingType::Number,
                ))
                .row_field(SubSetting::new(
                    "preferred_colour",
                    "Preferred cat colour",
                    SettingType::Text,
                )),
        ],
        new_instance: Arc::new(new_instance),
    }
}
