use clap::Parser;
use miette::Result;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod args;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
	let args = args::Args::parse();

	// RUST_LOG wins when set; otherwise the -v flags pick the level
	let fallback = match args.verbose {
		0 => "multiwatch=info",
		1 => "multiwatch=debug",
		_ => "trace",
	};
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
		)
		.init();

	let config = config::load(&args.config)?;
	debug!(?config, "configuration loaded");

	multiwatch::run(config).await?;
	Ok(())
}
