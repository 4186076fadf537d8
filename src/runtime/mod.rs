mod runner;

use std::path::Path;
use std::sync::Arc;

use crate::adapters::config::RunnerConfig;
use crate::adapters::datasources::register_all;
use crate::adapters::emitter::LogEmitter;
use crate::adapters::host::LocalHost;
use crate::error::{PluginError, PluginResult};

pub use runner::{drive, start_instances, PendingChange};

/// Load the config and run every configured datasource until Ctrl-C or the
/// configured run time is up.
pub fn run(config_path: Option<&Path>) -> PluginResult<()> {
    let config = RunnerConfig::load(config_path)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(PluginError::Runtime)?;

    runtime.block_on(async move {
        let mut host = LocalHost::new().with_listener(Arc::new(LogEmitter::new("dinoboard")));
        register_all(&mut host)?;

        let pending = start_instances(&mut host, &config)?;
        log::info!(
            "Running {} datasource(s), {} scheduled change(s)",
            host.instance_count(),
            pending.len()
        );

        drive(&mut host, pending, config.run_for(), ctrl_c()).await;
        Ok::<(), PluginError>(())
    })
}

async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", error);
        std::future::pending::<()>().await;
    }
}
