use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use crate::error::{PluginError, PluginResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    /// Free text input.
    Text,
    Number,
    /// Lets the user reference other datasources or write a JS expression.
    Calculated,
    /// Checkbox.
    Boolean,
    /// Select list, needs `options`.
    Option,
    /// Multiple rows of data, needs `settings` describing one row.
    Array,
}

impl SettingType {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingType::Text => "text",
            SettingType::Number => "number",
            SettingType::Calculated => "calculated",
            SettingType::Boolean => "boolean",
            SettingType::Option => "option",
            SettingType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl DefaultValue {
    pub fn to_json(&self) -> Value {
        match self {
            DefaultValue::Text(value) => json!(value),
            DefaultValue::Integer(value) => json!(value),
            DefaultValue::Float(value) => json!(value),
            DefaultValue::Bool(value) => json!(value),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            DefaultValue::Text(_) => "text",
            DefaultValue::Integer(_) => "integer",
            DefaultValue::Float(_) => "float",
            DefaultValue::Bool(_) => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingOption {
    pub name: String,
    /// Falls back to `name` when unset.
    pub value: Option<String>,
}

impl SettingOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn resolved_value(&self) -> &str {
        self.value
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.name)
    }
}

/// One column of an `array` setting.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSetting {
    pub name: String,
    pub display_name: String,
    pub kind: SettingType,
}

impl SubSetting {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, kind: SettingType) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub kind: SettingType,
    pub default_value: Option<DefaultValue>,
    pub options: Vec<SettingOption>,
    pub settings: Vec<SubSetting>,
}

impl SettingDefinition {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, kind: SettingType) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            kind,
            default_value: None,
            options: Vec::new(),
            settings: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn option(mut self, option: SettingOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn row_field(mut self, field: SubSetting) -> Self {
        self.settings.push(field);
        self
    }

    /// The value the host stores for this setting when the user leaves it untouched.
    pub fn default_json(&self) -> Option<Value> {
        self.default_value.as_ref().map(DefaultValue::to_json)
    }

    /// Descriptor entry in the shape the host's settings editor consumes.
    pub fn to_host_value(&self) -> PluginResult<Value> {
        if !is_js_identifier(&self.name) {
            return Err(PluginError::InvalidName {
                kind: "setting",
                name: self.name.clone(),
            });
        }
        self.check_default()?;

        let mut output = Map::new();
        output.insert("name".to_string(), json!(self.name));
        output.insert("display_name".to_string(), json!(self.display_name));
        output.insert("description".to_string(), json!(self.description));
        output.insert("type".to_string(), json!(self.kind.as_str()));
        if let Some(default) = self.default_json() {
            output.insert("default_value".to_string(), default);
        }

        match self.kind {
            SettingType::Option => {
                if self.options.is_empty() {
                    return Err(self.invalid("option settings need at least one option"));
                }
                let options = self
                    .options
                    .iter()
                    .map(|option| {
                        json!({
                            "name": option.name,
                            "value": option.resolved_value(),
                        })
                    })
                    .collect();
                output.insert("options".to_string(), Value::Array(options));
            }
            SettingType::Array => {
                if self.settings.is_empty() {
                    return Err(self.invalid("array settings need at least one row field"));
                }
                let mut rows = Vec::with_capacity(self.settings.len());
                for field in &self.settings {
                    if !is_js_identifier(&field.name) {
                        return Err(PluginError::InvalidName {
                            kind: "row field",
                            name: field.name.clone(),
                        });
                    }
                    if matches!(field.kind, SettingType::Option | SettingType::Array) {
                        return Err(self.invalid(format!(
                            "row field '{}' cannot be of type {}",
                            field.name,
                            field.kind.as_str()
                        )));
                    }
                    rows.push(json!({
                        "name": field.name,
                        "display_name": field.display_name,
                        "type": field.kind.as_str(),
                    }));
                }
                output.insert("settings".to_string(), Value::Array(rows));
            }
            _ => {}
        }

        Ok(Value::Object(output))
    }

    fn check_default(&self) -> PluginResult<()> {
        let Some(default) = &self.default_value else {
            return Ok(());
        };

        let fits = match (self.kind, default) {
            (
                SettingType::Text | SettingType::Calculated,
                DefaultValue::Text(_) | DefaultValue::Integer(_),
            ) => true,
            (SettingType::Number, DefaultValue::Integer(_)) => true,
            (SettingType::Number, DefaultValue::Float(value)) => {
                if !value.is_finite() {
                    return Err(self.invalid("numeric default must be finite"));
                }
                true
            }
            (SettingType::Boolean, DefaultValue::Bool(_)) => true,
            (SettingType::Option, DefaultValue::Text(value)) => {
                if !self
                    .options
                    .iter()
                    .any(|option| option.resolved_value() == value)
                {
                    return Err(self.invalid(format!("default '{value}' is not one of the options")));
                }
                true
            }
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(self.invalid(format!(
                "{} default does not fit a {} setting",
                default.kind(),
                self.kind.as_str()
            )))
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> PluginError {
        PluginError::InvalidSetting {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn settings_to_host_value(settings: &[SettingDefinition]) -> PluginResult<Vec<Value>> {
    let mut seen = HashSet::new();
    let mut output = Vec::with_capacity(settings.len());
    for setting in settings {
        if !seen.insert(setting.name.as_str()) {
            return Err(PluginError::DuplicateSetting(setting.name.clone()));
        }
        output.push(setting.to_host_value()?);
    }
    Ok(output)
}

/// Fill every missing (or null) field of `settings` with its schema default.
pub fn apply_defaults(schema: &[SettingDefinition], settings: Value) -> Value {
    let mut object = match settings {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    for setting in schema {
        let missing = object.get(&setting.name).map_or(true, Value::is_null);
        if missing {
            if let Some(default) = setting.default_json() {
                object.insert(setting.name.clone(), default);
            }
        }
    }
    Value::Object(object)
}

/// Deserialize a host settings object, treating `null` as an empty object.
pub fn parse_settings<T: DeserializeOwned>(type_name: &str, settings: Value) -> PluginResult<T> {
    let settings = match settings {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(settings).map_err(|source| PluginError::Settings {
        type_name: type_name.to_string(),
        source,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accept a JSON number or a numeric string. Blank strings and `null` are unset.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("expected a number, got '{trimmed}'"))
            })
        }
    }
}

pub(crate) fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Refresh {
        #[serde(default, deserialize_with = "lenient_number")]
        refresh: Option<f64>,
    }

    #[test]
    fn text_setting_renders_string_default() {
        let setting = SettingDefinition::new("datatext", "Data Text", SettingType::Text)
            .description("Text to provide as data.")
            .default_value(DefaultValue::Text("Foobar".to_string()));

        let value = setting.to_host_value().expect("render setting");
        assert_eq!(
            value,
            json!({
                "name": "datatext",
                "display_name": "Data Text",
                "description": "Text to provide as data.",
                "type": "text",
                "default_value": "Foobar",
            })
        );
    }

    #[test]
    fn setting_without_default_omits_default_value() {
        let setting = SettingDefinition::new("refresh", "Refresh", SettingType::Number);
        let value = setting.to_host_value().expect("render setting");
        assert!(value.get("default_value").is_none());
    }

    #[test]
    fn number_setting_accepts_integer_and_float_defaults() {
        let int = SettingDefinition::new("refresh", "Refresh", SettingType::Number)
            .default_value(DefaultValue::Integer(5));
        let float = SettingDefinition::new("refresh", "Refresh", SettingType::Number)
            .default_value(DefaultValue::Float(0.5));

        assert_eq!(int.to_host_value().expect("int")["default_value"], json!(5));
        assert_eq!(float.to_host_value().expect("float")["default_value"], json!(0.5));
    }

    #[test]
    fn number_setting_rejects_text_default() {
        let setting = SettingDefinition::new("refresh", "Refresh", SettingType::Number)
            .default_value(DefaultValue::Text("five".to_string()));
        let error = setting.to_host_value().expect_err("text default on number");
        assert!(matches!(error, PluginError::InvalidSetting { ref name, .. } if name == "refresh"));
    }

    #[test]
    fn number_setting_rejects_non_finite_default() {
        let setting = SettingDefinition::new("refresh", "Refresh", SettingType::Number)
            .default_value(DefaultValue::Float(f64::NAN));
        assert!(setting.to_host_value().is_err());
    }

    #[test]
    fn boolean_setting_takes_bool_default() {
        let setting = SettingDefinition::new("enabled", "Enabled", SettingType::Boolean)
            .default_value(DefaultValue::Bool(true));
        let value = setting.to_host_value().expect("render boolean");
        assert_eq!(value["type"], json!("boolean"));
        assert_eq!(value["default_value"], json!(true));
    }

    #[test]
    fn option_values_fall_back_to_names() {
        let setting = SettingDefinition::new("animal", "Animal", SettingType::Option)
            .option(SettingOption::new("Tiger"))
            .option(SettingOption::new("Lion").with_value("lion"));

        let value = setting.to_host_value().expect("render options");
        assert_eq!(
            value["options"],
            json!([
                { "name": "Tiger", "value": "Tiger" },
                { "name": "Lion", "value": "lion" },
            ])
        );
    }

    #[test]
    fn option_setting_needs_options() {
        let setting = SettingDefinition::new("animal", "Animal", SettingType::Option);
        assert!(setting.to_host_value().is_err());
    }

    #[test]
    fn option_default_must_match_an_option_value() {
        let setting = SettingDefinition::new("animal", "Animal", SettingType::Option)
            .option(SettingOption::new("Tiger"))
            .default_value(DefaultValue::Text("Puma".to_string()));
        assert!(setting.to_host_value().is_err());
    }

    #[test]
    fn array_setting_lists_row_fields() {
        let setting = SettingDefinition::new("refine", "Refine", SettingType::Array)
            .row_field(SubSetting::new("preferred_number", "Per cage", SettingType::Number))
            .row_field(SubSetting::new("preferred_colour", "Colour", SettingType::Text));

        let value = setting.to_host_value().expect("render array");
        assert_eq!(
            value["settings"],
            json!([
                { "name": "preferred_number", "display_name": "Per cage", "type": "number" },
                { "name": "preferred_colour", "display_name": "Colour", "type": "text" },
            ])
        );
    }

    #[test]
    fn array_setting_rejects_nested_arrays() {
        let setting = SettingDefinition::new("refine", "Refine", SettingType::Array)
            .row_field(SubSetting::new("inner", "Inner", SettingType::Array));
        assert!(setting.to_host_value().is_err());
    }

    #[test]
    fn setting_names_must_be_identifiers() {
        let setting = SettingDefinition::new("data text", "Data Text", SettingType::Text);
        let error = setting.to_host_value().expect_err("space in name");
        assert!(matches!(error, PluginError::InvalidName { kind: "setting", .. }));

        assert!(is_js_identifier("$value_1"));
        assert!(!is_js_identifier("1value"));
        assert!(!is_js_identifier(""));
    }

    #[test]
    fn duplicate_setting_names_are_rejected() {
        let schema = vec![
            SettingDefinition::new("datatext", "A", SettingType::Text),
            SettingDefinition::new("datatext", "B", SettingType::Text),
        ];
        let error = settings_to_host_value(&schema).expect_err("duplicate");
        assert!(matches!(error, PluginError::DuplicateSetting(ref name) if name == "datatext"));
    }

    #[test]
    fn apply_defaults_fills_missing_and_null_fields_only() {
        let schema = vec![
            SettingDefinition::new("datatext", "Data Text", SettingType::Text)
                .default_value(DefaultValue::Text("Foobar".to_string())),
            SettingDefinition::new("refresh", "Refresh", SettingType::Number)
                .default_value(DefaultValue::Integer(5)),
            SettingDefinition::new("note", "Note", SettingType::Text),
        ];

        let filled = apply_defaults(&schema, json!({ "datatext": "Hi", "refresh": null }));
        assert_eq!(filled, json!({ "datatext": "Hi", "refresh": 5 }));

        let from_null = apply_defaults(&schema, Value::Null);
        assert_eq!(from_null, json!({ "datatext": "Foobar", "refresh": 5 }));
    }

    #[test]
    fn lenient_number_reads_numbers_and_numeric_strings() {
        let parsed: Refresh = parse_settings("t", json!({ "refresh": 2 })).expect("number");
        assert_eq!(parsed.refresh, Some(2.0));

        let parsed: Refresh = parse_settings("t", json!({ "refresh": " 2.5 " })).expect("string");
        assert_eq!(parsed.refresh, Some(2.5));

        let parsed: Refresh = parse_settings("t", json!({ "refresh": "" })).expect("blank");
        assert_eq!(parsed.refresh, None);

        let parsed: Refresh = parse_settings("t", json!({})).expect("missing");
        assert_eq!(parsed.refresh, None);
    }

    #[test]
    fn lenient_number_rejects_garbage() {
        let result: PluginResult<Refresh> = parse_settings("t", json!({ "refresh": "soon" }));
        assert!(matches!(result, Err(PluginError::Settings { ref type_name, .. }) if type_name == "t"));
    }
}
