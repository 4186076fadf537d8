use crate::core::plugin::DatasourceDefinition;
use crate::error::PluginResult;

/// Registration side of the dashboard host.
pub trait HostPort {
    fn load_datasource_plugin(&mut self, definition: DatasourceDefinition) -> PluginResult<()>;
}
