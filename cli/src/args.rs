use std::path::PathBuf;

use clap::Parser;

/// Watch files and restart commands when they change.
///
/// Watchers are defined in the configuration file; each one runs
/// independently until any of them fails or the process is interrupted.
#[derive(Debug, Clone, Parser)]
#[command(name = "multiwatch", author, version, about)]
pub struct Args {
	/// Path to the configuration file
	#[arg(
		short,
		long,
		default_value = "multiwatch.toml",
		env = "MULTIWATCH_CONFIG"
	)]
	pub config: PathBuf,

	/// Raise diagnostic log level (repeatable)
	///
	/// Ignored when the RUST_LOG environment variable is set.
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}
