//! Multiwatch: a library for supervising commands that must be restarted
//! whenever watched files change.
//!
//! Each configured [watcher](config::WatcherSpec) is an independent pipeline:
//! filesystem events are filtered, coalesced by a rate-limit strategy, and
//! turned into restarts of the watcher's command, stopping the previous
//! process group first. The [`run`] entry point drives every watcher
//! concurrently until a fatal watch error or a shutdown signal.
//!
//! This library is powered by [Tokio](https://tokio.rs).
//!
//! It's recommended to use the [miette] erroring library in applications, but
//! all errors implement [`std::error::Error`] so your favourite error
//! handling library can of course be used.
//!
//! ```no_run
//! use miette::Result;
//! use multiwatch::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config: Config = toml::from_str(r#"
//!         [[watchers]]
//!         name = "api"
//!         watch.files = [{ path = "./src" }]
//!         rateLimit = { strategy = "debounce", wait = "100ms" }
//!         cmd.exec = "cargo run"
//!     "#).expect("static config");
//!
//!     multiwatch::run(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::unwrap_used)]
#![deny(rust_2018_idioms)]

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod fs;
pub mod ratelimit;
pub mod signal;
pub mod supervisor;
pub mod watcher;

mod run;

#[doc(inline)]
pub use crate::run::{run, run_until};
