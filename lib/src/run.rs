//! Running the whole supervisor tree.

use futures::future::join_all;
use tokio::{
	spawn,
	sync::{mpsc, watch},
};
use tracing::{debug, error, info_span, Instrument};

use crate::{config::Config, error::CriticalError, signal, watcher::WatcherUnit};

/// Run every configured watcher until a fatal error or a shutdown signal.
///
/// Installs the process-wide interrupt/terminate listener, then behaves as
/// [`run_until`].
pub async fn run(config: Config) -> Result<(), CriticalError> {
	let (shutdown_s, shutdown_r) = watch::channel(false);
	let signals = spawn(signal::worker(shutdown_s));

	let result = run_until(config, shutdown_r).await;
	signals.abort();
	result
}

/// Run every configured watcher until a fatal error or the given shutdown
/// channel flips.
///
/// Watchers that fail construction are logged and skipped; their siblings
/// proceed. The first watcher to report a fatal error cancels all the others,
/// and the call returns only once every watcher has observed cancellation and
/// exited. Dropping the shutdown sender counts as a shutdown request.
pub async fn run_until(
	config: Config,
	mut shutdown: watch::Receiver<bool>,
) -> Result<(), CriticalError> {
	let mut units = Vec::new();
	for spec in config.watchers {
		let name = spec.name.clone();
		match WatcherUnit::new(spec) {
			Ok(unit) => units.push(unit),
			Err(err) => error!(watcher=%name, %err, "skipping watcher that failed construction"),
		}
	}

	if units.is_empty() {
		return Err(CriticalError::NoWatchers);
	}

	let (cancel_s, cancel_r) = watch::channel(false);
	let relay = {
		let cancel = cancel_s.clone();
		spawn(async move {
			// a closed channel is as good as a shutdown request
			let _ = shutdown.changed().await;
			cancel.send(true).ok();
		})
	};

	let (fatal_s, mut fatal_r) = mpsc::channel(units.len());
	debug!(count=%units.len(), "starting watchers");

	let mut handles = Vec::with_capacity(units.len());
	for unit in units {
		let name = unit.name().to_owned();
		let span = info_span!("watcher", name=%name);
		let cancel_all = cancel_s.clone();
		let cancel = cancel_r.clone();
		let fatal = fatal_s.clone();

		handles.push(spawn(
			async move {
				if let Err(err) = unit.run(cancel).await {
					// any-fails-all-stop
					cancel_all.send(true).ok();
					fatal.send((name, err)).await.ok();
				}
			}
			.instrument(span),
		));
	}
	drop(fatal_s);

	let mut join_failure = None;
	for join in join_all(handles).await {
		if let Err(err) = join {
			error!(%err, "watcher task failed to join");
			join_failure.get_or_insert(err);
		}
	}

	relay.abort();
	debug!("all watchers have exited");

	// every sender is gone by now, so this cannot block: either the first
	// fatal error, or a clean end
	match fatal_r.recv().await {
		Some((name, source)) => Err(CriticalError::Watcher { name, source }),
		None => match join_failure {
			Some(err) => Err(CriticalError::TaskJoin(err)),
			None => Ok(()),
		},
	}
}
