use std::{path::PathBuf, process::ExitStatus};

use miette::Diagnostic;
use thiserror::Error;

use crate::{fs::WatcherKind, signal::KillSignal};

/// Errors which may be recoverable, transient, or only affect one watcher.
///
/// Spawn and termination errors are recovered locally: they are logged and
/// the watch loop keeps going, so the next file change retries. Watch-source
/// errors end the owning watcher, which in turn cancels the whole run.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
#[diagnostic(url(docsrs))]
pub enum RuntimeError {
	/// Error received when a filesystem watcher cannot be instantiated.
	#[error("{kind:?} fs watcher failed to instantiate: {err}")]
	#[diagnostic(code(multiwatch::runtime::fs_watcher_create))]
	FsWatcherCreate {
		/// The kind of watcher that failed.
		kind: WatcherKind,

		/// The underlying error.
		#[source]
		err: notify::Error,
	},

	/// Error received when a watch target cannot be registered.
	#[error("cannot watch `{}`: {err}", .path.display())]
	#[diagnostic(code(multiwatch::runtime::fs_watcher_path_add))]
	FsWatcherPathAdd {
		/// The target path.
		path: PathBuf,

		/// The underlying error.
		#[source]
		err: notify::Error,
	},

	/// Error reported by a running filesystem watcher.
	#[error("{kind:?} fs watcher error: {err}")]
	#[diagnostic(code(multiwatch::runtime::fs_watcher_event))]
	FsWatcherEvent {
		/// The kind of watcher that errored.
		kind: WatcherKind,

		/// The underlying error.
		#[source]
		err: notify::Error,
	},

	/// Error received when an event cannot be queued because the channel is full.
	#[error("cannot send event from {ctx}: channel full")]
	#[diagnostic(code(multiwatch::runtime::event_channel_full))]
	EventChannelFull {
		/// The context in which this error happened.
		ctx: &'static str,
	},

	/// Error received when operating on a process.
	#[error("when operating on process: {0}")]
	#[diagnostic(code(multiwatch::runtime::process))]
	Process(#[source] std::io::Error),

	/// Error received when the configured command cannot be started.
	#[error("cannot start command: {0}")]
	#[diagnostic(
		code(multiwatch::runtime::spawn),
		help("the process slot stays empty; the next trigger retries the spawn")
	)]
	Spawn(#[source] std::io::Error),

	/// Error received when a process did not start correctly, or finished
	/// before we could even tell.
	#[error("process was dead on arrival")]
	#[diagnostic(code(multiwatch::runtime::process_doa))]
	ProcessDeadOnArrival,

	/// Error received when a stopped process exited neither cleanly nor by
	/// the delivered kill signal.
	#[error("process exited abnormally: {status}")]
	#[diagnostic(code(multiwatch::runtime::termination))]
	Termination {
		/// How the process actually exited.
		status: ExitStatus,
	},

	/// Error received when the configured signal cannot be delivered on this
	/// platform.
	#[error("unsupported signal: {0:?}")]
	#[diagnostic(code(multiwatch::runtime::unsupported_signal))]
	UnsupportedSignal(KillSignal),

	/// Error received when trying to render a command with nothing to run.
	#[error("empty shelled command")]
	#[diagnostic(code(multiwatch::runtime::command_shell::empty_command))]
	EmptyCommand,

	/// Error received when trying to render a unix shell with an empty program.
	#[error("empty shell program")]
	#[diagnostic(code(multiwatch::runtime::command_shell::empty_shell))]
	EmptyShell,
}
