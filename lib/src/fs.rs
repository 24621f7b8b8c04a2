//! Watching the filesystem for changes.
//!
//! This is the watch collaborator: it registers a watcher's targets with the
//! backend and delivers [`Event`]s and errors over channels until closed.
//! The backend runs its own dispatch internally; nothing here blocks the
//! watch loop.

use std::time::Duration;

use notify::{Config as NotifyConfig, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
	config::{Watch, WatchFile, WatchMethod},
	error::RuntimeError,
	event::{Event, Op},
};

/// What kind of filesystem watcher to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum WatcherKind {
	/// The platform's native change notification.
	Native,

	/// Periodic scanning with the given interval.
	Poll(Duration),
}

impl From<&Watch> for WatcherKind {
	fn from(watch: &Watch) -> Self {
		match watch.method {
			WatchMethod::Fsnotify => Self::Native,
			WatchMethod::Polling => Self::Poll(watch.interval),
		}
	}
}

impl WatcherKind {
	fn create(
		self,
		f: impl notify::EventHandler,
	) -> Result<Box<dyn Watcher + Send>, RuntimeError> {
		match self {
			Self::Native => {
				RecommendedWatcher::new(f, NotifyConfig::default()).map(|w| Box::new(w) as _)
			}
			Self::Poll(interval) => {
				PollWatcher::new(f, NotifyConfig::default().with_poll_interval(interval))
					.map(|w| Box::new(w) as _)
			}
		}
		.map_err(|err| RuntimeError::FsWatcherCreate { kind: self, err })
	}
}

/// A running watch over one watcher's target set.
///
/// Both channels close when the source is closed or dropped; a `None` from
/// [`events`][WatchSource::events] is the "closed" signal. Dropping the
/// source releases every watch the backend holds.
pub struct WatchSource {
	// Kept only for its Drop: deregisters all paths and stops delivery.
	_watcher: Box<dyn Watcher + Send>,

	/// Accepted-shape change events, in delivery order.
	pub events: mpsc::Receiver<Event>,

	/// Errors reported by the running backend.
	pub errors: mpsc::Receiver<RuntimeError>,
}

impl WatchSource {
	/// Register every target and start delivering events.
	///
	/// Fails if the backend cannot be created or a target cannot be watched
	/// (a nonexistent path, most commonly) — construction failures here are
	/// fatal to the owning watcher.
	pub fn start(kind: WatcherKind, targets: &[WatchFile]) -> Result<Self, RuntimeError> {
		let (ev_s, ev_r) = mpsc::channel(1024);
		let (er_s, er_r) = mpsc::channel(64);

		let mut watcher = kind.create(move |nev: Result<notify::Event, notify::Error>| {
			trace!(event = ?nev, "receiving possible event from watcher");
			match nev {
				Ok(nev) => {
					for event in flatten(nev) {
						if ev_s.try_send(event).is_err() {
							er_s.try_send(RuntimeError::EventChannelFull { ctx: "fs watcher" })
								.ok();
						}
					}
				}
				Err(err) => {
					er_s.try_send(RuntimeError::FsWatcherEvent { kind, err }).ok();
				}
			}
		})?;

		for target in targets {
			let mode = if target.recursive {
				RecursiveMode::Recursive
			} else {
				RecursiveMode::NonRecursive
			};

			trace!(path = ?target.path, ?mode, "adding path to the watcher");
			watcher
				.watch(&target.path, mode)
				.map_err(|err| RuntimeError::FsWatcherPathAdd {
					path: target.path.clone(),
					err,
				})?;
		}

		debug!(?kind, targets=%targets.len(), "filesystem watch started");
		Ok(Self {
			_watcher: watcher,
			events: ev_r,
			errors: er_r,
		})
	}

	/// Stop watching and release the backend's resources.
	///
	/// Equivalent to dropping the source; spelled out so every exit path in
	/// the watch loop reads the same.
	pub fn close(self) {}
}

/// One backend notification can cover several paths; split it up, dropping
/// access-only noise which carries no change.
fn flatten(nev: notify::Event) -> Vec<Event> {
	if matches!(nev.kind, notify::EventKind::Access(_)) {
		return Vec::new();
	}

	let op = Op::from(&nev.kind);
	nev.paths
		.into_iter()
		.map(|path| Event { path, op })
		.collect()
}
