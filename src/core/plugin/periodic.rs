use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::core::ports::emitter::EmitterPort;
use crate::error::{PluginError, PluginResult};

use super::ticker::RefreshTimer;

struct SourceState<S> {
    settings: S,
    /// Bumped on every restart and on dispose; ticks from older generations are dropped.
    generation: u64,
    stopped: bool,
}

/// Settings-driven payload emitter on a refresh timer.
///
/// Ticks render and emit while holding the state lock, and `restart`/`dispose`
/// bump the generation under that same lock, so once either returns no tick of
/// the previous timer can emit. A new generation is only recorded after its
/// timer has been spawned. The `EmitterPort` must not call back into the
/// owning plugin synchronously.
pub struct PeriodicSource<S> {
    state: Arc<Mutex<SourceState<S>>>,
    render: fn(&S) -> Value,
    update: Arc<dyn EmitterPort>,
    timer: RefreshTimer,
}

impl<S: Send + 'static> PeriodicSource<S> {
    /// Build the source and start its first timer.
    pub fn start(
        settings: S,
        render: fn(&S) -> Value,
        update: Arc<dyn EmitterPort>,
        period: Duration,
    ) -> PluginResult<Self> {
        let mut source = Self {
            state: Arc::new(Mutex::new(SourceState {
                settings,
                generation: 0,
                stopped: false,
            })),
            render,
            update,
            timer: RefreshTimer::new(),
        };
        source.restart(period)?;
        Ok(source)
    }

    /// Emit once from the current settings. No-op after `dispose`.
    pub fn emit_now(&self) {
        let payload = {
            let state = lock(&self.state);
            if state.stopped {
                log::debug!("Ignoring refresh of a disposed datasource");
                return;
            }
            (self.render)(&state.settings)
        };
        self.update.emit(&payload);
    }

    pub fn replace_settings(&self, settings: S) -> PluginResult<()> {
        let mut state = lock(&self.state);
        if state.stopped {
            return Err(PluginError::Disposed);
        }
        state.settings = settings;
        Ok(())
    }

    /// Cancel the running timer and start a new one with `period`.
    pub fn restart(&mut self, period: Duration) -> PluginResult<()> {
        self.switch_timer(period, None)
    }

    /// Swap in new settings together with a new timer.
    ///
    /// When the timer cannot be started nothing changes: the previous
    /// settings and timer stay in place.
    pub fn reconfigure(&mut self, settings: S, period: Duration) -> PluginResult<()> {
        self.switch_timer(period, Some(settings))
    }

    fn switch_timer(&mut self, period: Duration, settings: Option<S>) -> PluginResult<()> {
        let generation = {
            let state = lock(&self.state);
            if state.stopped {
                return Err(PluginError::Disposed);
            }
            state.generation + 1
        };

        let state = Arc::clone(&self.state);
        let update = Arc::clone(&self.update);
        let render = self.render;
        self.timer.start(period, move || {
            let state = lock(&state);
            if state.stopped || state.generation != generation {
                return;
            }
            let payload = render(&state.settings);
            update.emit(&payload);
        })?;

        let mut state = lock(&self.state);
        state.generation = generation;
        if let Some(settings) = settings {
            state.settings = settings;
        }
        Ok(())
    }

    /// Stop for good. Safe to call more than once.
    pub fn dispose(&mut self) {
        {
            let mut state = lock(&self.state);
            if !state.stopped {
                state.stopped = true;
                state.generation += 1;
            }
        }
        if self.timer.cancel() {
            log::debug!("Datasource timer cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        !lock(&self.state).stopped && self.timer.is_active()
    }

    pub fn period(&self) -> Option<Duration> {
        self.timer.period()
    }
}

impl<S: Clone> PeriodicSource<S> {
    pub fn settings(&self) -> S {
        lock(&self.state).settings.clone()
    }
}

fn lock<S>(state: &Mutex<SourceState<S>>) -> MutexGuard<'_, SourceState<S>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
