//! Downstream-facing services.

pub mod emitter;

pub use emitter::{AlertStatus, DownstreamEmitter};
