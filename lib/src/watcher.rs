//! One independently running watch-and-restart pipeline.

use std::time::{Duration, Instant};

use tokio::{select, sync::watch, time};
use tracing::{debug, error, info, trace};

use crate::{
	config::{WatchFile, WatcherSpec},
	error::{ConfigError, RuntimeError},
	filter::ChangeFilter,
	fs::{WatchSource, WatcherKind},
	ratelimit::{RateLimiter, Trigger},
	supervisor::Supervisor,
};

/// One watcher: filter, rate limiter, and process supervisor wired around a
/// watch source, driven by a single task.
///
/// Construction is the fail-fast point for everything the configuration can
/// get wrong; a failed construction affects only this watcher.
pub struct WatcherUnit {
	name: String,
	kind: WatcherKind,
	targets: Vec<WatchFile>,
	filter: ChangeFilter,
	limiter: RateLimiter,
	supervisor: Supervisor,
}

impl WatcherUnit {
	/// Validate a spec into a runnable unit.
	pub fn new(spec: WatcherSpec) -> Result<Self, ConfigError> {
		if spec.watch.files.is_empty() {
			return Err(ConfigError::NoWatchTargets { watcher: spec.name });
		}

		if spec.command.exec.trim().is_empty() {
			return Err(ConfigError::EmptyCommand { watcher: spec.name });
		}

		let filter = ChangeFilter::compile(&spec.watch.filters)?;
		let limiter = RateLimiter::new(spec.rate_limit.strategy, spec.rate_limit.wait)?;
		let kind = WatcherKind::from(&spec.watch);

		Ok(Self {
			name: spec.name,
			kind,
			targets: spec.watch.files,
			filter,
			limiter,
			supervisor: Supervisor::new(spec.command, spec.kill),
		})
	}

	/// The watcher's configured name, for log and error attribution.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Run until a fatal watch error or cancellation.
	///
	/// Watch-source errors are fatal and returned after a best-effort stop of
	/// any running child. Cancellation and source closure exit cleanly, also
	/// stopping the child. Per-trigger spawn/termination problems are logged
	/// and the loop continues: the next change retries.
	pub async fn run(mut self, mut cancel: watch::Receiver<bool>) -> Result<(), RuntimeError> {
		let mut source = WatchSource::start(self.kind, &self.targets)?;
		info!("watching");

		let result = loop {
			let maxtime = self.limiter.deadline().map_or_else(
				|| Duration::from_secs(u64::MAX),
				|deadline| deadline.saturating_duration_since(Instant::now()),
			);

			select! {
				_ = cancel.changed() => {
					debug!("cancellation requested, stopping");
					break Ok(());
				}

				received = time::timeout(maxtime, source.events.recv()) => match received {
					Err(_timeout) => {
						if let Some(trigger) = self.limiter.expire(Instant::now()) {
							self.update(trigger).await;
						}
					}
					Ok(None) => {
						debug!("watch source closed, stopping");
						break Ok(());
					}
					Ok(Some(event)) => {
						trace!(%event, "event received");
						if !self.filter.accepts(&event) {
							continue;
						}

						debug!(%event, "change accepted");
						if let Some(trigger) = self.limiter.event(event, Instant::now()) {
							self.update(trigger).await;
						}
					}
				},

				Some(err) = source.errors.recv() => {
					error!(%err, "error occurred during watch");
					break Err(err);
				}
			}
		};

		source.close();
		self.supervisor.stop().await;
		result
	}

	/// Handle one coalesced trigger: restart the command.
	async fn update(&mut self, trigger: Trigger) {
		info!(event=%trigger.event, "updating");
		if let Err(err) = self.supervisor.restart().await {
			error!(%err, "error occurred during handling update");
		}
	}
}
