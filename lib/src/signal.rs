//! Cross-platform handling of the signals we send and receive.
//!
//! [`KillSignal`] is the configured signal delivered to a watcher's child
//! process group; [`worker`] is the process-wide listener that turns an
//! interrupt or terminate aimed at us into orchestrator-wide cancellation.

use std::{fmt, str::FromStr};

#[cfg(unix)]
use command_group::Signal as NixSignal;
use miette::Diagnostic;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, trace};

/// A signal sent to a child process group to stop it.
///
/// On Windows, where there is no direct equivalent, delivery falls back to
/// terminating the process group; the named variants still parse so that
/// configuration files stay portable.
///
/// There are several "first-class" signals with their own variants, and a
/// generic [`Custom`][KillSignal::Custom] variant for arbitrary signal
/// numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KillSignal {
	/// `SIGHUP`: the terminal is disconnected. Often repurposed to mean
	/// "reload configuration".
	Hangup,

	/// `SIGKILL`: stop immediately. Handled by the kernel, not the process,
	/// so it cannot be intercepted; the child may exit in an inconsistent
	/// state.
	ForceStop,

	/// `SIGINT`: interrupt, as from the keyboard.
	Interrupt,

	/// `SIGQUIT`: quit and dump core. Rarely used.
	Quit,

	/// `SIGTERM`: the conventional "please stop" signal, and the default.
	#[default]
	Terminate,

	/// `SIGUSR1`: application-defined.
	User1,

	/// `SIGUSR2`: application-defined.
	User2,

	/// An arbitrary signal number.
	///
	/// Numbers that don't resolve to a signal on the current platform are
	/// reported as unsupported at delivery time.
	Custom(i32),
}

impl KillSignal {
	/// Converts to a [`nix::Signal`][command_group::Signal] if possible.
	///
	/// Returns `None` only for [`Custom`][KillSignal::Custom] numbers the
	/// platform doesn't know.
	#[cfg(unix)]
	pub fn to_nix(self) -> Option<NixSignal> {
		match self {
			Self::Hangup => Some(NixSignal::SIGHUP),
			Self::ForceStop => Some(NixSignal::SIGKILL),
			Self::Interrupt => Some(NixSignal::SIGINT),
			Self::Quit => Some(NixSignal::SIGQUIT),
			Self::Terminate => Some(NixSignal::SIGTERM),
			Self::User1 => Some(NixSignal::SIGUSR1),
			Self::User2 => Some(NixSignal::SIGUSR2),
			Self::Custom(sig) => NixSignal::try_from(sig).ok(),
		}
	}

	/// Converts from a [`nix::Signal`][command_group::Signal].
	#[cfg(unix)]
	pub fn from_nix(sig: NixSignal) -> Self {
		match sig {
			NixSignal::SIGHUP => Self::Hangup,
			NixSignal::SIGKILL => Self::ForceStop,
			NixSignal::SIGINT => Self::Interrupt,
			NixSignal::SIGQUIT => Self::Quit,
			NixSignal::SIGTERM => Self::Terminate,
			NixSignal::SIGUSR1 => Self::User1,
			NixSignal::SIGUSR2 => Self::User2,
			sig => Self::Custom(sig as _),
		}
	}

	/// The raw signal number, used to compare against a child's wait status.
	///
	/// Signal identity is always compared by number, never by name string.
	#[cfg(unix)]
	pub fn number(self) -> Option<i32> {
		self.to_nix().map(|sig| sig as i32)
	}
}

impl fmt::Display for KillSignal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Hangup => f.write_str("SIGHUP"),
			Self::ForceStop => f.write_str("SIGKILL"),
			Self::Interrupt => f.write_str("SIGINT"),
			Self::Quit => f.write_str("SIGQUIT"),
			Self::Terminate => f.write_str("SIGTERM"),
			Self::User1 => f.write_str("SIGUSR1"),
			Self::User2 => f.write_str("SIGUSR2"),
			Self::Custom(n) => write!(f, "signal {n}"),
		}
	}
}

impl From<i32> for KillSignal {
	/// Converts from a raw signal number, using hardcoded numbers for the
	/// first-class signals.
	fn from(raw: i32) -> Self {
		match raw {
			1 => Self::Hangup,
			2 => Self::Interrupt,
			3 => Self::Quit,
			9 => Self::ForceStop,
			10 => Self::User1,
			12 => Self::User2,
			15 => Self::Terminate,
			_ => Self::Custom(raw),
		}
	}
}

impl FromStr for KillSignal {
	type Err = SignalParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Ok(raw) = i32::from_str(s) {
			return Ok(Self::from(raw));
		}

		let upper = s.to_ascii_uppercase();
		match upper.strip_prefix("SIG").unwrap_or(&upper) {
			"HUP" => Ok(Self::Hangup),
			"KILL" => Ok(Self::ForceStop),
			"INT" => Ok(Self::Interrupt),
			"QUIT" => Ok(Self::Quit),
			"TERM" => Ok(Self::Terminate),
			"USR1" => Ok(Self::User1),
			"USR2" => Ok(Self::User2),
			_ => Err(SignalParseError::new(s, "unsupported signal")),
		}
	}
}

impl<'de> Deserialize<'de> for KillSignal {
	fn deserialize<D>(de: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct SignalVisitor;

		impl<'de> Visitor<'de> for SignalVisitor {
			type Value = KillSignal;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a signal name like \"TERM\" or a signal number")
			}

			fn visit_str<E: de::Error>(self, v: &str) -> Result<KillSignal, E> {
				KillSignal::from_str(v).map_err(E::custom)
			}

			fn visit_i64<E: de::Error>(self, v: i64) -> Result<KillSignal, E> {
				i32::try_from(v)
					.map(KillSignal::from)
					.map_err(|_| E::custom("signal number out of range"))
			}

			fn visit_u64<E: de::Error>(self, v: u64) -> Result<KillSignal, E> {
				i32::try_from(v)
					.map(KillSignal::from)
					.map_err(|_| E::custom("signal number out of range"))
			}
		}

		de.deserialize_any(SignalVisitor)
	}
}

/// Error when parsing a signal from string.
#[derive(Debug, Diagnostic, Error)]
#[error("invalid signal `{src}`: {err}")]
#[diagnostic(code(multiwatch::signal::parse), url(docsrs))]
pub struct SignalParseError {
	// The string that was parsed.
	#[source_code]
	src: String,

	// The error that occurred.
	err: String,

	// The span of the source which is in error.
	#[label = "invalid signal"]
	span: (usize, usize),
}

impl SignalParseError {
	fn new(src: &str, err: &str) -> Self {
		Self {
			src: src.to_owned(),
			err: err.to_owned(),
			span: (0, src.len()),
		}
	}
}

/// Launch the process-wide shutdown listener.
///
/// The first interrupt or terminate aimed at this process flips the
/// cancellation channel, which every watcher observes at its select point.
/// Listener setup failures are logged rather than propagated: the run can
/// still be stopped by a unit failure or by the embedding caller.
pub async fn worker(cancel: watch::Sender<bool>) {
	if let Err(err) = imp_worker(cancel).await {
		error!(%err, "cannot listen for shutdown signals");
	}
}

#[cfg(unix)]
async fn imp_worker(cancel: watch::Sender<bool>) -> std::io::Result<()> {
	use tokio::signal::unix::{signal, SignalKind};

	debug!("launching unix signal worker");

	macro_rules! listen {
		($sig:ident) => {{
			trace!(kind=%stringify!($sig), "listening for unix signal");
			signal(SignalKind::$sig())?
		}};
	}

	let mut s_interrupt = listen!(interrupt);
	let mut s_terminate = listen!(terminate);

	let sig = tokio::select!(
		_ = s_interrupt.recv() => "SIGINT",
		_ = s_terminate.recv() => "SIGTERM",
	);

	debug!(%sig, "received shutdown signal, stopping all watchers");
	cancel.send(true).ok();
	Ok(())
}

#[cfg(windows)]
async fn imp_worker(cancel: watch::Sender<bool>) -> std::io::Result<()> {
	use tokio::signal::windows::{ctrl_break, ctrl_c};

	debug!("launching windows signal worker");

	let mut s_interrupt = ctrl_c()?;
	let mut s_terminate = ctrl_break()?;

	let sig = tokio::select!(
		_ = s_interrupt.recv() => "Ctrl+C",
		_ = s_terminate.recv() => "Ctrl+Break",
	);

	debug!(%sig, "received shutdown notification, stopping all watchers");
	cancel.send(true).ok();
	Ok(())
}
