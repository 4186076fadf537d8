use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{PluginError, PluginResult};

/// Owns at most one periodic tokio task.
///
/// `start` always cancels the running task before spawning the next one, and
/// dropping the timer cancels it.
#[derive(Debug, Default)]
pub struct RefreshTimer {
    task: Option<AbortHandle>,
    period: Option<Duration>,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_tick` every `period`, first one period from now.
    pub fn start<F>(&mut self, period: Duration, mut on_tick: F) -> PluginResult<()>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(PluginError::ZeroPeriod);
        }
        let runtime = Handle::try_current().map_err(|_| PluginError::NoRuntime)?;
        let first_tick = Instant::now()
            .checked_add(period)
            .ok_or(PluginError::PeriodTooLong(period))?;

        self.cancel();

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        });

        self.task = Some(handle.abort_handle());
        self.period = Some(period);
        log::debug!("Refresh timer started with period {:?}", period);
        Ok(())
    }

    /// Returns whether a task was running.
    pub fn cancel(&mut self) -> bool {
        self.period = None;
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
