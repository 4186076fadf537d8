pub mod cats;
pub mod test_plugin;

use crate::core::plugin::DatasourceDefinition;
use crate::core::ports::host::HostPort;
use crate::error::PluginResult;

pub fn definitions() -> Vec<DatasourceDefinition> {
    vec![test_plugin::definition(), cats::definition()]
}

/// Plugin entry point: registers every bundled data source with the host.
pub fn register_all(host: &mut dyn HostPort) -> PluginResult<()> {
    for definition in definitions() {
        let type_name = definition.type_name.clone();
        host.load_datasource_plugin(definition)?;
        log::info!("Registered datasource plugin '{}'", type_name);
    }
    Ok(())
}
