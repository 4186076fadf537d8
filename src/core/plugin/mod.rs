mod definition;
mod periodic;
pub mod settings;
mod ticker;

use serde_json::Value;

use crate::error::PluginResult;

pub use definition::{DatasourceDefinition, InstanceCallback, NewInstanceFn};
pub use periodic::PeriodicSource;
pub use settings::{DefaultValue, SettingDefinition, SettingOption, SettingType, SubSetting};
pub use ticker::RefreshTimer;

/// A live data source instance as the host sees it.
///
/// The host owns the instance and is the only caller, so every method takes
/// `&mut self`. Emissions flow back through the `EmitterPort` handed to the
/// factory, not through return values.
pub trait DatasourcePlugin: Send {
    /// Replace the instance's settings with a fresh object from the host.
    fn on_settings_changed(&mut self, settings: Value) -> PluginResult<()>;

    /// Manual refresh requested by the user.
    fn update_now(&mut self);

    /// The instance is no longer needed. Must be safe to call twice.
    fn on_dispose(&mut self);
}
