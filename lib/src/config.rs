//! The configuration data model.
//!
//! This is the validated, defaulted shape the rest of the library consumes;
//! parsing a file into it (and layering environment overrides) is the
//! caller's concern. Field names and defaults follow the configuration file
//! format: `rateLimit`, `cmd`, and the filter keys `on`/`type`/`list`.
//!
//! Durations deserialize from humantime strings (`"100ms"`, `"2s"`) or plain
//! integer milliseconds.

use std::{collections::HashMap, fmt, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::signal::KillSignal;

/// The whole configuration: every watcher to run.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
	/// The watchers to run concurrently.
	#[serde(default)]
	pub watchers: Vec<WatcherSpec>,
}

/// One independent watch-and-run unit.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WatcherSpec {
	/// Human-readable identifier, used only for log and error attribution.
	#[serde(default)]
	pub name: String,

	/// What to watch and how.
	#[serde(default)]
	pub watch: Watch,

	/// How to coalesce bursts of change events.
	#[serde(default, rename = "rateLimit", alias = "rate_limit")]
	pub rate_limit: RateLimit,

	/// How to stop the previous process before a restart.
	#[serde(default)]
	pub kill: Kill,

	/// The command to (re)start on changes.
	#[serde(default, rename = "cmd", alias = "command")]
	pub command: Command,
}

/// Watch targets, backend selection, and filters for one watcher.
#[derive(Clone, Debug, Deserialize)]
pub struct Watch {
	/// Which watch backend to use.
	#[serde(default)]
	pub method: WatchMethod,

	/// Scan interval for the polling backend.
	#[serde(default = "default_interval", deserialize_with = "duration::parse")]
	pub interval: Duration,

	/// The paths to watch. Must be non-empty.
	#[serde(default)]
	pub files: Vec<WatchFile>,

	/// Filters applied, in order, to every raw change event.
	#[serde(default)]
	pub filters: Vec<FilterSpec>,
}

impl Default for Watch {
	fn default() -> Self {
		Self {
			method: WatchMethod::default(),
			interval: default_interval(),
			files: Vec::new(),
			filters: Vec::new(),
		}
	}
}

/// Which filesystem watch backend to use.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchMethod {
	/// Periodic scanning. The default: it behaves identically everywhere,
	/// at the cost of latency bounded by the interval.
	#[default]
	Polling,

	/// The platform's native change notification.
	Fsnotify,
}

/// One watch target.
#[derive(Clone, Debug, Deserialize)]
pub struct WatchFile {
	/// The path to watch. May be a file or a directory.
	pub path: PathBuf,

	/// Whether to descend into subdirectories.
	#[serde(default = "yes")]
	pub recursive: bool,
}

/// One accept/reject rule applied to change events.
#[derive(Clone, Debug, Deserialize)]
pub struct FilterSpec {
	/// What part of the event the rule examines.
	#[serde(default, rename = "on")]
	pub scope: FilterScope,

	/// `true` forwards events that match; `false` inverts, rejecting matches.
	#[serde(default = "yes")]
	pub include: bool,

	/// How `list` entries are interpreted.
	#[serde(default, rename = "type")]
	pub kind: FilterKind,

	/// The patterns (or exact names) to match against.
	#[serde(default, rename = "list", alias = "patterns")]
	pub patterns: Vec<String>,
}

/// What part of a change event a filter examines.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
	/// The final component of the changed path.
	#[default]
	Filename,

	/// The operation name: `create`, `modify`, `remove`, `rename`, `other`.
	Operation,
}

/// How filter patterns are interpreted.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
	/// Each pattern is a regular expression; any match counts.
	#[default]
	Regex,

	/// Each entry is an exact name.
	List,
}

/// Burst-coalescing policy for one watcher.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct RateLimit {
	/// The coalescing strategy.
	#[serde(default)]
	pub strategy: RateLimitStrategy,

	/// The quiescence (debounce) or window (throttle) duration.
	#[serde(default, deserialize_with = "duration::parse")]
	pub wait: Duration,
}

/// The closed set of rate-limit strategies.
///
/// `Audit` and `Sample` are declared so configuration can name them, but they
/// have no semantics yet: constructing a limiter with either is a
/// [`ConfigError`][crate::error::ConfigError], never a silent `None`.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitStrategy {
	/// Every accepted event fires, in order.
	#[default]
	None,

	/// Fire once, with the latest event, after a quiet period.
	Debounce,

	/// Fire immediately on the first event of a window; drop the rest.
	Throttle,

	/// Reserved; not yet supported.
	Audit,

	/// Reserved; not yet supported.
	Sample,
}

impl fmt::Display for RateLimitStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::None => "none",
			Self::Debounce => "debounce",
			Self::Throttle => "throttle",
			Self::Audit => "audit",
			Self::Sample => "sample",
		})
	}
}

/// How to stop a watcher's running process before a restart.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Kill {
	/// The signal delivered to the whole process group.
	#[serde(default)]
	pub signal: KillSignal,

	/// Grace period before escalating to a forced kill.
	///
	/// Zero means wait indefinitely for the process to exit.
	#[serde(default, deserialize_with = "duration::parse")]
	pub timeout: Duration,
}

/// The command a watcher (re)starts, and the context it runs in.
#[derive(Clone, Debug, Deserialize)]
pub struct Command {
	/// The shell to run `exec` with.
	///
	/// A unix shell invocation (program plus options, called with `-c`), or
	/// the specials `none` (split `exec` on whitespace and run it directly)
	/// and `powershell`.
	#[serde(default = "default_shell")]
	pub shell: String,

	/// The command line to run.
	#[serde(default)]
	pub exec: String,

	/// Working directory for the command.
	#[serde(default = "default_path")]
	pub path: PathBuf,

	/// Environment overrides, layered on the inherited environment.
	#[serde(default)]
	pub env: HashMap<String, String>,
}

impl Default for Command {
	fn default() -> Self {
		Self {
			shell: default_shell(),
			exec: String::new(),
			path: default_path(),
			env: HashMap::new(),
		}
	}
}

fn yes() -> bool {
	true
}

fn default_interval() -> Duration {
	Duration::from_millis(100)
}

fn default_shell() -> String {
	"/bin/sh".into()
}

fn default_path() -> PathBuf {
	".".into()
}

pub(crate) mod duration {
	use std::{fmt, time::Duration};

	use serde::de::{self, Deserializer, Visitor};

	pub fn parse<'de, D>(de: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct DurationVisitor;

		impl<'de> Visitor<'de> for DurationVisitor {
			type Value = Duration;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a duration string like \"100ms\" or a number of milliseconds")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
				humantime::parse_duration(v).map_err(E::custom)
			}

			fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
				Ok(Duration::from_millis(v))
			}

			fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
				u64::try_from(v)
					.map(Duration::from_millis)
					.map_err(|_| E::custom("duration cannot be negative"))
			}
		}

		de.deserialize_any(DurationVisitor)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn full_watcher_parses() {
		let config: Config = toml::from_str(
			r#"
			[[watchers]]
			name = "api"

			[watchers.watch]
			method = "polling"
			interval = "50ms"
			files = [
				{ path = "./src", recursive = true },
				{ path = "./go.mod", recursive = false },
			]
			filters = [
				{ on = "filename", include = true, type = "regex", list = ["\\.go$"] },
			]

			[watchers.rateLimit]
			strategy = "debounce"
			wait = "100ms"

			[watchers.kill]
			signal = "TERM"
			timeout = "5s"

			[watchers.cmd]
			exec = "go run ./cmd/api"
			path = "./api"
			env = { PORT = "8080" }
			"#,
		)
		.expect("config should parse");

		let w = &config.watchers[0];
		assert_eq!(w.name, "api");
		assert_eq!(w.watch.interval, Duration::from_millis(50));
		assert_eq!(w.watch.files.len(), 2);
		assert!(!w.watch.files[1].recursive);
		assert_eq!(w.watch.filters[0].patterns, vec!["\\.go$"]);
		assert_eq!(w.rate_limit.strategy, RateLimitStrategy::Debounce);
		assert_eq!(w.rate_limit.wait, Duration::from_millis(100));
		assert_eq!(w.kill.signal, KillSignal::Terminate);
		assert_eq!(w.kill.timeout, Duration::from_secs(5));
		assert_eq!(w.command.exec, "go run ./cmd/api");
		assert_eq!(w.command.env["PORT"], "8080");
	}

	#[test]
	fn defaults_fill_in() {
		let config: Config = toml::from_str(
			r#"
			[[watchers]]
			watch.files = [{ path = "." }]
			cmd.exec = "echo hi"
			"#,
		)
		.expect("config should parse");

		let w = &config.watchers[0];
		assert_eq!(w.watch.method, WatchMethod::Polling);
		assert_eq!(w.watch.interval, Duration::from_millis(100));
		assert!(w.watch.files[0].recursive);
		assert_eq!(w.rate_limit.strategy, RateLimitStrategy::None);
		assert_eq!(w.rate_limit.wait, Duration::ZERO);
		assert_eq!(w.kill.signal, KillSignal::Terminate);
		assert_eq!(w.kill.timeout, Duration::ZERO);
		assert_eq!(w.command.shell, "/bin/sh");
		assert_eq!(w.command.path, PathBuf::from("."));
	}

	#[test]
	fn durations_accept_millis() {
		let config: Config = toml::from_str(
			r#"
			[[watchers]]
			watch.files = [{ path = "." }]
			rateLimit = { strategy = "throttle", wait = 250 }
			cmd.exec = "echo hi"
			"#,
		)
		.expect("config should parse");

		assert_eq!(
			config.watchers[0].rate_limit.wait,
			Duration::from_millis(250)
		);
	}

	#[test]
	fn signal_parses_from_number() {
		let config: Config = toml::from_str(
			r#"
			[[watchers]]
			watch.files = [{ path = "." }]
			kill = { signal = 2 }
			cmd.exec = "echo hi"
			"#,
		)
		.expect("config should parse");

		assert_eq!(config.watchers[0].kill.signal, KillSignal::Interrupt);
	}
}
