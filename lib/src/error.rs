//! Error types.
//!
//! Split by blast radius, following the propagation policy: [`ConfigError`]
//! fails one watcher at construction, [`RuntimeError`] is recovered or ends
//! one watcher, [`CriticalError`] ends the whole run.

mod config;
mod critical;
mod runtime;

pub use config::ConfigError;
pub use critical::CriticalError;
pub use runtime::RuntimeError;
