//! Injectable time source shared by the token bucket, the rate limiter, the authorizer, and
//! the retry loop.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Clock::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Source of the current instant plus a way to wait.
pub trait Clock
where
	Self: Debug + Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;

	/// Suspends the caller for `duration`; non-positive durations complete immediately.
	fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Clock backed by the system time and tokio timers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		if !duration.is_positive() {
			return Box::pin(async {});
		}

		Box::pin(tokio::time::sleep(duration.unsigned_abs()))
	}
}

/// Deterministic clock: sleeping advances the clock instantly and is recorded.
#[derive(Debug)]
pub struct ManualClock {
	now: Mutex<OffsetDateTime>,
	sleeps: Mutex<Vec<Duration>>,
}
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self { now: Mutex::new(start), sleeps: Mutex::new(Vec::new()) }
	}

	/// Moves the clock forward without recording a sleep.
	pub fn advance(&self, duration: Duration) {
		*self.now.lock() += duration;
	}

	/// Every duration passed to [`Clock::sleep`], in call order.
	pub fn sleeps(&self) -> Vec<Duration> {
		self.sleeps.lock().clone()
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.now.lock()
	}

	fn sleep(&self, duration: Duration) -> SleepFuture {
		self.sleeps.lock().push(duration);

		if duration.is_positive() {
			self.advance(duration);
		}

		Box::pin(async {})
	}
}
