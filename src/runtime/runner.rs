use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep_until, Instant};

use crate::adapters::config::RunnerConfig;
use crate::adapters::host::LocalHost;
use crate::error::PluginResult;

/// A settings change waiting for its turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub after: Duration,
    pub instance_id: String,
    pub settings: Value,
}

/// Create every configured instance and return their scheduled changes,
/// earliest first.
///
/// A datasource that fails to start is logged and skipped.
pub fn start_instances(
    host: &mut LocalHost,
    config: &RunnerConfig,
) -> PluginResult<VecDeque<PendingChange>> {
    let mut pending = Vec::new();

    for datasource in &config.datasources {
        let settings = datasource.settings_json()?;
        let instance_id = match host.create_instance(&datasource.type_name, settings) {
            Ok(id) => id,
            Err(error) => {
                log::error!(
                    "Skipping datasource of type '{}': {}",
                    datasource.type_name,
                    error
                );
                continue;
            }
        };

        for change in &datasource.changes {
            pending.push(PendingChange {
                after: change.delay(),
                instance_id: instance_id.clone(),
                settings: change.settings_json(&datasource.type_name)?,
            });
        }
    }

    // stable: changes due at the same time keep config order
    pending.sort_by_key(|change| change.after);
    Ok(pending.into())
}

/// `None` when `after` lies beyond what the clock can represent.
fn deadline_after(started: Instant, after: Duration) -> Option<Instant> {
    let deadline = started.checked_add(after);
    if deadline.is_none() {
        log::warn!("{:?} is too far in the future, treating it as never", after);
    }
    deadline
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Apply `pending` as they come due, then dispose every instance once
/// `shutdown` resolves or `run_for` has elapsed.
pub async fn drive<F>(
    host: &mut LocalHost,
    mut pending: VecDeque<PendingChange>,
    run_for: Option<Duration>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let started = Instant::now();
    let deadline = run_for.and_then(|run_for| deadline_after(started, run_for));
    tokio::pin!(shutdown);

    loop {
        let next_change = pending
            .front()
            .and_then(|change| deadline_after(started, change.after));
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutdown requested");
                break;
            }
            _ = sleep_until_some(deadline) => {
                log::info!("Run time elapsed");
                break;
            }
            _ = sleep_until_some(next_change) => {
                let Some(change) = pending.pop_front() else {
                    continue;
                };
                if let Err(error) = host.update_settings(&change.instance_id, change.settings) {
                    log::error!(
                        "Failed to apply settings to datasource {}: {}",
                        change.instance_id,
                        error
                    );
                }
            }
        }
    }

    host.dispose_all();
    log::info!("All datasources disposed");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::adapters::config::{DatasourceConfig, ScheduledChange};
    use crate::adapters::datasources::register_all;
    use crate::adapters::emitter::{drain, ChannelEmitter};

    fn table(value: Value) -> toml::Table {
        serde_json::from_value(value).expect("toml table")
    }

    fn datasource(type_name: &str, settings: Value, changes: Vec<(f64, Value)>) -> DatasourceConfig {
        DatasourceConfig {
            type_name: type_name.to_string(),
            settings: table(settings),
            changes: changes
                .into_iter()
                .map(|(after_secs, settings)| ScheduledChange {
                    after_secs,
                    settings: table(settings),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn changes_are_ordered_and_bad_types_skipped() {
        let mut host = LocalHost::new();
        register_all(&mut host).expect("register");
        let config = RunnerConfig {
            run_for_secs: None,
            datasources: vec![
                datasource("testplugin", json!({}), vec![(3.0, json!({ "datatext": "b" }))]),
                datasource("weather", json!({}), vec![(0.5, json!({}))]),
                datasource("catsplugin", json!({}), vec![(1.0, json!({ "catname": "a" }))]),
            ],
        };

        let pending = start_instances(&mut host, &config).expect("start");
        assert_eq!(host.instance_count(), 2);
        let delays: Vec<Duration> = pending.iter().map(|change| change.after).collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(3)]);
        assert_eq!(pending[0].settings, json!({ "catname": "a" }));
        host.dispose_all();
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_change_retimes_until_run_time_is_up() {
        let (listener, mut rx) = ChannelEmitter::new();
        let mut host = LocalHost::new().with_listener(Arc::new(listener));
        register_all(&mut host).expect("register");
        let config = RunnerConfig {
            run_for_secs: Some(4),
            datasources: vec![datasource(
                "testplugin",
                json!({ "datatext": "Foobar" }),
                vec![(2.0, json!({ "datatext": "Hi", "refresh": 0.75 }))],
            )],
        };

        let pending = start_instances(&mut host, &config).expect("start");
        drive(&mut host, pending, config.run_for(), std::future::pending()).await;

        // immediate emission at 2s, ticks at 2.75s and 3.5s
        let hi = json!({ "datatext": "Hi", "animal": "dinosaur" });
        assert_eq!(drain(&mut rx), vec![hi.clone(), hi.clone(), hi]);
        assert_eq!(host.instance_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wins_over_pending_changes() {
        let (listener, mut rx) = ChannelEmitter::new();
        let mut host = LocalHost::new().with_listener(Arc::new(listener));
        register_all(&mut host).expect("register");
        let config = RunnerConfig {
            run_for_secs: None,
            datasources: vec![datasource(
                "testplugin",
                json!({}),
                vec![(60.0, json!({ "datatext": "never" }))],
            )],
        };

        let pending = start_instances(&mut host, &config).expect("start");
        let shutdown = tokio::time::sleep(Duration::from_secs(12));
        drive(&mut host, pending, None, shutdown).await;

        let foobar = json!({ "datatext": "Foobar", "animal": "dinosaur" });
        assert_eq!(drain(&mut rx), vec![foobar.clone(), foobar]);
        assert_eq!(host.instance_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn far_future_times_mean_never() {
        let mut host = LocalHost::new();
        register_all(&mut host).expect("register");
        let config = RunnerConfig {
            run_for_secs: Some(u64::MAX),
            datasources: vec![datasource(
                "testplugin",
                json!({}),
                vec![(1e19, json!({ "datatext": "never" }))],
            )],
        };

        let pending = start_instances(&mut host, &config).expect("start");
        let shutdown = tokio::time::sleep(Duration::from_secs(3));
        drive(&mut host, pending, config.run_for(), shutdown).await;
        assert_eq!(host.instance_count(), 0);
    }
}
