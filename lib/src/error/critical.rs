use miette::Diagnostic;
use thiserror::Error;
use tokio::task::JoinError;

use super::RuntimeError;

/// Errors which are not recoverable and stop the whole run.
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
#[diagnostic(url(docsrs))]
pub enum CriticalError {
	/// Error received when no watcher could be constructed from the
	/// configuration.
	#[error("no watchers could be constructed")]
	#[diagnostic(
		code(multiwatch::critical::no_watchers),
		help("check the `watchers` section of the configuration")
	)]
	NoWatchers,

	/// The first fatal error reported by a watcher.
	///
	/// All other watchers are cancelled when this happens; their clean exits
	/// are not errors.
	#[error("watcher `{name}` failed: {source}")]
	#[diagnostic(code(multiwatch::critical::watcher))]
	Watcher {
		/// The name of the failed watcher.
		name: String,

		/// The underlying error.
		#[source]
		source: RuntimeError,
	},

	/// A critical I/O error occurred.
	#[error("io({about}): {err}")]
	#[diagnostic(code(multiwatch::critical::io_error))]
	IoError {
		/// What it was about.
		about: &'static str,

		/// The I/O error which occurred.
		#[source]
		err: std::io::Error,
	},

	/// Error received when joining a watcher task.
	#[error("watcher task join: {0}")]
	#[diagnostic(code(multiwatch::critical::task_join))]
	TaskJoin(#[source] JoinError),
}
