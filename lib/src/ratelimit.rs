//! Coalescing bursts of change events into restart triggers.
//!
//! The limiter is a timer-free state machine: the owning watch loop feeds it
//! accepted events and the current instant, asks for the next deadline, and
//! calls [`expire`][RateLimiter::expire] when that deadline passes. Keeping
//! time out of the limiter keeps the policies directly testable, and running
//! it on the watch loop's single task means a trigger can never be in flight
//! twice for the same watcher.

use std::{
	mem,
	time::{Duration, Instant},
};

use tracing::trace;

use crate::{config::RateLimitStrategy, error::ConfigError, event::Event};

/// A restart request, distilled from one or more change events.
///
/// Carries the policy-selected event (latest for debounce, first for
/// throttle) for logging only; consumed exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
	/// The representative change event.
	pub event: Event,
}

/// Applies one watcher's rate-limit strategy to its accepted events.
#[derive(Debug)]
pub struct RateLimiter {
	mode: Mode,
	wait: Duration,
	state: State,
}

/// The strategies that actually have semantics.
#[derive(Clone, Copy, Debug)]
enum Mode {
	Passthrough,
	Debounce,
	Throttle,
}

#[derive(Debug, Default)]
enum State {
	#[default]
	Idle,
	Debouncing {
		deadline: Instant,
		latest: Event,
	},
	Throttling {
		until: Instant,
	},
}

impl RateLimiter {
	/// Build a limiter for the configured strategy.
	///
	/// `audit` and `sample` are declared but have no semantics yet; they are
	/// rejected here rather than silently behaving like `none`.
	pub fn new(strategy: RateLimitStrategy, wait: Duration) -> Result<Self, ConfigError> {
		let mode = match strategy {
			RateLimitStrategy::None => Mode::Passthrough,
			RateLimitStrategy::Debounce => Mode::Debounce,
			RateLimitStrategy::Throttle => Mode::Throttle,
			RateLimitStrategy::Audit | RateLimitStrategy::Sample => {
				return Err(ConfigError::UnsupportedRateLimit { strategy })
			}
		};

		Ok(Self {
			mode,
			wait,
			state: State::Idle,
		})
	}

	/// Feed one accepted event; returns a trigger when the policy fires now.
	pub fn event(&mut self, event: Event, now: Instant) -> Option<Trigger> {
		match self.mode {
			Mode::Passthrough => Some(Trigger { event }),

			Mode::Debounce => {
				// every event reopens the quiet period
				self.state = State::Debouncing {
					deadline: now + self.wait,
					latest: event,
				};
				None
			}

			Mode::Throttle => match self.state {
				State::Throttling { until } if now < until => {
					trace!(%event, "event dropped within throttle window");
					None
				}
				_ => {
					self.state = State::Throttling {
						until: now + self.wait,
					};
					Some(Trigger { event })
				}
			},
		}
	}

	/// The next instant at which [`expire`][RateLimiter::expire] should run.
	pub fn deadline(&self) -> Option<Instant> {
		match self.state {
			State::Idle => None,
			State::Debouncing { deadline, .. } => Some(deadline),
			State::Throttling { until } => Some(until),
		}
	}

	/// Advance past a reached deadline, firing a pending debounce trigger.
	///
	/// Calling early is harmless: the pending state is kept.
	pub fn expire(&mut self, now: Instant) -> Option<Trigger> {
		match mem::take(&mut self.state) {
			State::Idle => None,

			State::Debouncing { deadline, latest } => {
				if now >= deadline {
					Some(Trigger { event: latest })
				} else {
					self.state = State::Debouncing { deadline, latest };
					None
				}
			}

			State::Throttling { until } => {
				if now < until {
					self.state = State::Throttling { until };
				}
				None
			}
		}
	}
}

#[cfg(test)]
mod test {
	use std::path::PathBuf;

	use super::*;
	use crate::event::Op;

	const WAIT: Duration = Duration::from_millis(100);

	fn event(n: u32) -> Event {
		Event {
			path: PathBuf::from(format!("file-{n}.go")),
			op: Op::Modify,
		}
	}

	fn limiter(strategy: RateLimitStrategy) -> RateLimiter {
		RateLimiter::new(strategy, WAIT).expect("strategy is supported")
	}

	#[test]
	fn none_fires_every_time_in_order() {
		let mut rl = limiter(RateLimitStrategy::None);
		let t0 = Instant::now();

		for n in 0..5 {
			let trigger = rl.event(event(n), t0).expect("none always fires");
			assert_eq!(trigger.event, event(n));
		}
		assert_eq!(rl.deadline(), None);
	}

	#[test]
	fn debounce_fires_once_with_latest_after_quiet_period() {
		let mut rl = limiter(RateLimitStrategy::Debounce);
		let t0 = Instant::now();

		// five events, 10ms apart: all swallowed
		for n in 0..5 {
			let at = t0 + Duration::from_millis(10 * u64::from(n));
			assert_eq!(rl.event(event(n), at), None);
		}

		let last = t0 + Duration::from_millis(40);
		assert_eq!(rl.deadline(), Some(last + WAIT));

		// not yet quiet: nothing fires, pending state is kept
		assert_eq!(rl.expire(last + WAIT - Duration::from_millis(1)), None);
		assert_eq!(rl.deadline(), Some(last + WAIT));

		let trigger = rl.expire(last + WAIT).expect("quiet period elapsed");
		assert_eq!(trigger.event, event(4));

		// consumed: nothing further
		assert_eq!(rl.deadline(), None);
		assert_eq!(rl.expire(last + WAIT * 2), None);
	}

	#[test]
	fn debounce_resets_window_on_each_event() {
		let mut rl = limiter(RateLimitStrategy::Debounce);
		let t0 = Instant::now();

		assert_eq!(rl.event(event(0), t0), None);
		let t1 = t0 + Duration::from_millis(90);
		assert_eq!(rl.event(event(1), t1), None);

		// the first event's deadline has passed, but event 1 reopened the window
		assert_eq!(rl.expire(t0 + WAIT), None);
		let trigger = rl.expire(t1 + WAIT).expect("window reopened by event 1");
		assert_eq!(trigger.event, event(1));
	}

	#[test]
	fn throttle_fires_leading_edge_and_drops_the_rest() {
		let mut rl = limiter(RateLimitStrategy::Throttle);
		let t0 = Instant::now();

		let trigger = rl.event(event(0), t0).expect("leading edge fires");
		assert_eq!(trigger.event, event(0));

		assert_eq!(rl.event(event(1), t0 + Duration::from_millis(10)), None);
		assert_eq!(rl.event(event(2), t0 + Duration::from_millis(99)), None);

		// window elapsed: next event starts a new one and fires
		let trigger = rl
			.event(event(3), t0 + WAIT)
			.expect("new window after the wait");
		assert_eq!(trigger.event, event(3));
	}

	#[test]
	fn throttle_window_closes_via_expire_too() {
		let mut rl = limiter(RateLimitStrategy::Throttle);
		let t0 = Instant::now();

		rl.event(event(0), t0).expect("leading edge fires");
		assert_eq!(rl.deadline(), Some(t0 + WAIT));

		assert_eq!(rl.expire(t0 + WAIT), None);
		assert_eq!(rl.deadline(), None);
	}

	#[test]
	fn zero_wait_debounce_fires_on_next_expire() {
		let mut rl =
			RateLimiter::new(RateLimitStrategy::Debounce, Duration::ZERO).expect("supported");
		let t0 = Instant::now();

		assert_eq!(rl.event(event(0), t0), None);
		let trigger = rl.expire(t0).expect("deadline is immediate");
		assert_eq!(trigger.event, event(0));
	}

	#[test]
	fn reserved_strategies_are_rejected() {
		for strategy in [RateLimitStrategy::Audit, RateLimitStrategy::Sample] {
			let err = RateLimiter::new(strategy, WAIT).expect_err("reserved strategy");
			assert!(matches!(
				err,
				ConfigError::UnsupportedRateLimit { strategy: s } if s == strategy
			));
		}
	}
}
