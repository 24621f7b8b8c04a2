use miette::Diagnostic;
use thiserror::Error;

use crate::config::RateLimitStrategy;

/// Errors occurring while constructing a watcher from its configuration.
///
/// These are fatal to the one watcher being constructed; sibling watchers
/// proceed unaffected.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
#[diagnostic(url(docsrs))]
pub enum ConfigError {
	/// Error received when a watcher has nothing to watch.
	#[error("watcher `{watcher}` has no watch targets")]
	#[diagnostic(code(multiwatch::config::no_watch_targets))]
	NoWatchTargets {
		/// The name of the offending watcher.
		watcher: String,
	},

	/// Error received when a watcher has no command to run on changes.
	#[error("watcher `{watcher}` has no command to run")]
	#[diagnostic(code(multiwatch::config::empty_command))]
	EmptyCommand {
		/// The name of the offending watcher.
		watcher: String,
	},

	/// Error received when a filter pattern cannot be compiled.
	#[error("cannot compile filter pattern `{pattern}`: {err}")]
	#[diagnostic(code(multiwatch::config::filter_pattern))]
	FilterPattern {
		/// The pattern as written in the configuration.
		pattern: String,

		/// The underlying regex error.
		#[source]
		err: regex::Error,
	},

	/// Error received when a declared rate-limit strategy has no semantics yet.
	///
	/// `audit` and `sample` are named in the data model but deliberately not
	/// given behaviour; configuring them is an error rather than a silent
	/// fallback to `none`.
	#[error("rate limit strategy `{strategy}` is not yet supported")]
	#[diagnostic(
		code(multiwatch::config::unsupported_rate_limit),
		help("use one of: none, debounce, throttle")
	)]
	UnsupportedRateLimit {
		/// The strategy as configured.
		strategy: RateLimitStrategy,
	},
}
