use serde_json::Value;

/// The host's update callback. Every emission of a data source ends up here.
pub trait EmitterPort: Send + Sync {
    fn emit(&self, payload: &Value);
}
