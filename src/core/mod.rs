pub mod plugin;
pub mod ports;
