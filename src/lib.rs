pub mod adapters;
pub mod core;
pub mod error;
pub mod runtime;

use std::path::PathBuf;

use crate::error::PluginResult;

pub fn run() -> PluginResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    runtime::run(config_path.as_deref())
}
