//! Small cross-cutting helpers.

pub mod logger;

pub use logger::setup_logging;
