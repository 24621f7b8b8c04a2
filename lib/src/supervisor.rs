//! Process supervision: one child process slot and the stop-then-start
//! protocol that triggers drive.

use std::{mem, process::ExitStatus};

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use tokio::time;
use tracing::{debug, error, info, trace, warn};

use crate::{command, config, error::RuntimeError, signal::KillSignal};

/// The child process slot.
///
/// `Terminating` is transient within [`Supervisor::terminate`]: the slot is
/// taken, the group is signalled and reaped, and the slot ends up `Absent`
/// again before the next spawn.
#[derive(Debug, Default)]
enum Slot {
	#[default]
	Absent,
	Running(AsyncGroupChild),
}

/// Owns the single child process slot for one watcher.
///
/// Commands are always spawned as process group leaders so that termination
/// reaches every descendant, not just the immediate child. The child inherits
/// our stdout/stderr; nothing is buffered or parsed.
///
/// All calls are serialized by the owning watcher's single task; the
/// supervisor is not safe under concurrent use and is never shared.
#[derive(Debug)]
pub struct Supervisor {
	command: config::Command,
	kill: config::Kill,
	slot: Slot,
}

impl Supervisor {
	/// A supervisor with an empty slot; nothing runs until the first trigger.
	pub fn new(command: config::Command, kill: config::Kill) -> Self {
		Self {
			command,
			kill,
			slot: Slot::Absent,
		}
	}

	/// Whether a child currently occupies the slot.
	pub fn is_running(&self) -> bool {
		matches!(self.slot, Slot::Running(_))
	}

	/// Stop-then-start: the single entry point driven by triggers.
	///
	/// A previous process that did not stop cleanly is reported here and does
	/// not prevent the spawn. A spawn failure leaves the slot empty, so the
	/// next trigger retries.
	pub async fn restart(&mut self) -> Result<(), RuntimeError> {
		if let Err(err) = self.terminate().await {
			error!(%err, "previous process did not stop cleanly");
		}

		self.spawn().await
	}

	/// Best-effort stop for shutdown paths; problems are logged, never
	/// returned.
	pub async fn stop(&mut self) {
		if let Err(err) = self.terminate().await {
			warn!(%err, "process did not stop cleanly during shutdown");
		}
	}

	async fn spawn(&mut self) -> Result<(), RuntimeError> {
		let mut command = command::spawnable(&self.command)?;
		debug!(?command, "spawning command");

		let child = command.group_spawn().map_err(RuntimeError::Spawn)?;
		let pgid = child.id().ok_or(RuntimeError::ProcessDeadOnArrival)?;
		info!(%pgid, "process group spawned");

		self.slot = Slot::Running(child);
		Ok(())
	}

	/// Signal the whole process group, wait for it to exit, and escalate to
	/// a forced kill once the grace period runs out.
	///
	/// Succeeds trivially when the slot is empty. Exit by exactly the
	/// delivered signal (or the forced kill, when escalation fired) is the
	/// expected outcome and not an error.
	pub(crate) async fn terminate(&mut self) -> Result<(), RuntimeError> {
		let Slot::Running(mut child) = mem::take(&mut self.slot) else {
			trace!("nothing to terminate");
			return Ok(());
		};

		// The child may have died on its own since the last trigger; its
		// status still gets interpreted, but no signal goes out.
		if let Some(status) = child.try_wait().map_err(RuntimeError::Process)? {
			debug!(?status, "process had already exited");
			return interpret(status, self.kill.signal, false);
		}

		debug!(pgid=?child.id(), signal=%self.kill.signal, "stopping process group");
		self.deliver(&mut child)?;

		let mut forced = false;
		let status = if self.kill.timeout.is_zero() {
			child.wait().await.map_err(RuntimeError::Process)?
		} else {
			match time::timeout(self.kill.timeout, child.wait()).await {
				Ok(status) => status.map_err(RuntimeError::Process)?,
				Err(_elapsed) => {
					warn!(
						timeout=?self.kill.timeout,
						"process did not exit within the grace period, killing"
					);
					forced = true;
					child.kill().map_err(RuntimeError::Process)?;
					child.wait().await.map_err(RuntimeError::Process)?
				}
			}
		};

		debug!(?status, "process group stopped");
		interpret(status, self.kill.signal, forced)
	}

	#[cfg(unix)]
	fn deliver(&self, child: &mut AsyncGroupChild) -> Result<(), RuntimeError> {
		use command_group::UnixChildExt;

		let sig = self
			.kill
			.signal
			.to_nix()
			.ok_or(RuntimeError::UnsupportedSignal(self.kill.signal))?;
		child.signal(sig).map_err(RuntimeError::Process)
	}

	#[cfg(not(unix))]
	fn deliver(&self, child: &mut AsyncGroupChild) -> Result<(), RuntimeError> {
		// No per-signal delivery here; terminating the group is the closest
		// analogue, whatever signal was configured.
		child.kill().map_err(RuntimeError::Process)
	}
}

#[cfg(unix)]
fn interpret(status: ExitStatus, sent: KillSignal, forced: bool) -> Result<(), RuntimeError> {
	use std::os::unix::process::ExitStatusExt;

	if let Some(sig) = status.signal() {
		if Some(sig) == sent.number() {
			debug!(signal=%sent, "process exited by the delivered signal");
			return Ok(());
		}
		if forced && Some(sig) == KillSignal::ForceStop.number() {
			debug!("process exited by the escalated kill");
			return Ok(());
		}
		return Err(RuntimeError::Termination { status });
	}

	if status.success() {
		Ok(())
	} else {
		Err(RuntimeError::Termination { status })
	}
}

#[cfg(not(unix))]
fn interpret(status: ExitStatus, _sent: KillSignal, forced: bool) -> Result<(), RuntimeError> {
	// Signal-terminated exits cannot be distinguished from exit codes here;
	// anything we forced is expected, anything clean is fine.
	if forced || status.success() {
		Ok(())
	} else {
		Err(RuntimeError::Termination { status })
	}
}

#[cfg(all(test, unix))]
mod test {
	use std::time::{Duration, Instant};

	use super::*;

	fn supervisor(exec: &str, kill: config::Kill) -> Supervisor {
		Supervisor::new(
			config::Command {
				exec: exec.into(),
				..Default::default()
			},
			kill,
		)
	}

	fn term_kill(timeout: Duration) -> config::Kill {
		config::Kill {
			signal: KillSignal::Terminate,
			timeout,
		}
	}

	#[tokio::test]
	async fn terminate_on_empty_slot_is_a_noop() {
		let mut sup = supervisor("echo hi", term_kill(Duration::ZERO));
		assert!(!sup.is_running());
		sup.terminate().await.expect("empty slot terminates trivially");
	}

	#[tokio::test]
	async fn exit_by_the_delivered_signal_is_expected() {
		let mut sup = supervisor("sleep 5", term_kill(Duration::ZERO));
		sup.restart().await.expect("sleep spawns");
		assert!(sup.is_running());

		sup.terminate()
			.await
			.expect("SIGTERM exit is the success path");
		assert!(!sup.is_running());
	}

	#[tokio::test]
	async fn natural_nonzero_exit_is_a_termination_error() {
		let mut sup = supervisor("exit 4", term_kill(Duration::ZERO));
		sup.restart().await.expect("shell spawns");

		// let it die of its own accord
		tokio::time::sleep(Duration::from_millis(300)).await;

		let err = sup
			.terminate()
			.await
			.expect_err("self-exit with a nonzero code is abnormal");
		assert!(matches!(err, RuntimeError::Termination { .. }));
		assert!(!sup.is_running());
	}

	#[tokio::test]
	async fn natural_zero_exit_is_fine() {
		let mut sup = supervisor("true", term_kill(Duration::ZERO));
		sup.restart().await.expect("shell spawns");

		tokio::time::sleep(Duration::from_millis(300)).await;

		sup.terminate().await.expect("clean self-exit is not abnormal");
	}

	#[tokio::test]
	async fn spawn_failure_leaves_slot_absent_and_retries() {
		let mut sup = Supervisor::new(
			config::Command {
				shell: "none".into(),
				exec: "multiwatch-test-no-such-binary".into(),
				..Default::default()
			},
			term_kill(Duration::ZERO),
		);

		let err = sup.restart().await.expect_err("binary does not exist");
		assert!(matches!(err, RuntimeError::Spawn(_)));
		assert!(!sup.is_running());

		// the next trigger hits the same spawn error, not a poisoned state
		let err = sup.restart().await.expect_err("still does not exist");
		assert!(matches!(err, RuntimeError::Spawn(_)));
	}

	#[tokio::test]
	async fn grace_period_escalates_to_kill() {
		// ignores SIGTERM and keeps respawning children so the group wait
		// cannot finish without the escalation
		let mut sup = supervisor(
			"trap '' TERM; while true; do sleep 0.1; done",
			term_kill(Duration::from_millis(250)),
		);
		sup.restart().await.expect("shell spawns");

		let begin = Instant::now();
		tokio::time::timeout(Duration::from_secs(5), sup.terminate())
			.await
			.expect("escalation bounds the wait")
			.expect("forced kill is an expected termination");

		assert!(begin.elapsed() >= Duration::from_millis(250));
		assert!(!sup.is_running());
	}

	#[tokio::test]
	async fn restart_replaces_the_running_process() {
		let mut sup = supervisor("sleep 5", term_kill(Duration::ZERO));
		sup.restart().await.expect("first spawn");
		assert!(sup.is_running());

		sup.restart().await.expect("second spawn after terminate");
		assert!(sup.is_running());

		sup.stop().await;
		assert!(!sup.is_running());
	}
}
