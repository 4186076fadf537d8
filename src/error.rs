use std::path::PathBuf;

pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("{kind} name '{name}' is not a valid JavaScript identifier")]
    InvalidName { kind: &'static str, name: String },

    #[error("setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("setting '{0}' is declared more than once")]
    DuplicateSetting(String),

    #[error("invalid settings for '{type_name}': {source}")]
    Settings {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("datasource plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("unknown datasource plugin '{0}'")]
    UnknownPlugin(String),

    #[error("unknown datasource instance '{0}'")]
    UnknownInstance(String),

    #[error("datasource plugin '{0}' never handed back an instance")]
    NoInstance(String),

    #[error("plugin instance has been disposed")]
    Disposed,

    #[error("refresh timers need a running tokio runtime")]
    NoRuntime,

    #[error("refresh period must be greater than zero")]
    ZeroPeriod,

    #[error("refresh period of {0:?} is too long to schedule")]
    PeriodTooLong(std::time::Duration),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
