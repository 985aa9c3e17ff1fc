//! Fault-management core for a near-RT RAN controller.
//!
//! Ingests alarm raise/clear/reraise/clear-all events from the platform
//! message bus and the admin HTTP surface, deduplicates and reconciles them
//! against an in-memory active/history store, and relays state changes to an
//! Alertmanager-compatible backend (and optionally a notification manager).

pub mod config;
pub mod core;
pub mod definitions;
pub mod error;
pub mod http;
pub mod metrics;
pub mod model;
pub mod services;
pub mod utils;

pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");