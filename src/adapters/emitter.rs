use serde_json::Value;
use tokio::sync::mpsc;

use crate::core::ports::emitter::EmitterPort;

/// Writes every emission to the log.
pub struct LogEmitter {
    label: String,
}

impl LogEmitter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl EmitterPort for LogEmitter {
    fn emit(&self, payload: &Value) {
        log::info!("[{}] {}", self.label, payload);
    }
}

/// Forwards emissions into an unbounded channel.
pub struct ChannelEmitter {
    tx: mpsc::UnboundedSender<Value>,
}

impl ChannelEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EmitterPort for ChannelEmitter {
    fn emit(&self, payload: &Value) {
        let _ = self.tx.send(payload.clone());
    }
}

#[cfg(test)]
pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<Value>) -> Vec<Value> {
    let mut values = Vec::new();
    while let Ok(value) = rx.try_recv() {
        values.push(value);
    }
    values
}
