pub mod config;
pub mod datasources;
pub mod emitter;
pub mod host;
