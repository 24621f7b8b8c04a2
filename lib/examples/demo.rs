//! Watches the current directory for Rust source changes and echoes on each
//! coalesced trigger. Run with `RUST_LOG=multiwatch=debug` to watch the
//! pipeline at work; stop with Ctrl-C.

use std::time::Duration;

use miette::Result;
use multiwatch::config::{
	Command, Config, FilterKind, FilterScope, FilterSpec, RateLimit, RateLimitStrategy, Watch,
	WatchFile, WatcherSpec,
};

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let config = Config {
		watchers: vec![WatcherSpec {
			name: "demo".into(),
			watch: Watch {
				files: vec![WatchFile {
					path: ".".into(),
					recursive: true,
				}],
				filters: vec![FilterSpec {
					scope: FilterScope::Filename,
					include: true,
					kind: FilterKind::Regex,
					patterns: vec![r"\.rs$".into()],
				}],
				..Default::default()
			},
			rate_limit: RateLimit {
				strategy: RateLimitStrategy::Debounce,
				wait: Duration::from_millis(500),
			},
			command: Command {
				exec: "echo 'something changed!'".into(),
				..Default::default()
			},
			..Default::default()
		}],
	};

	multiwatch::run(config).await?;
	Ok(())
}
