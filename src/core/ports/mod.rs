pub mod emitter;
pub mod host;
