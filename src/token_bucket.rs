//! Token bucket primitive used by the rate limiter for basic request pacing.
//!
//! The bucket is not internally synchronized; every mutating method takes `&mut self` and
//! callers that share a bucket wrap it in their own lock.

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
};

/// Errors produced by [`TokenBucket`].
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum TokenBucketError {
	/// Refill rate must be a positive, finite number.
	#[error("Refill rate must be positive and finite, got {rate}.")]
	InvalidRate {
		/// Rejected rate.
		rate: f64,
	},
	/// Capacity must be a non-negative, finite number.
	#[error("Capacity must be non-negative and finite, got {capacity}.")]
	InvalidCapacity {
		/// Rejected capacity.
		capacity: f64,
	},
	/// [`TokenBucket::consume`] asked for more tokens than were available.
	#[error("Requested {requested} tokens but only {available} are available.")]
	Insufficient {
		/// Tokens requested.
		requested: f64,
		/// Tokens available at the time of the call.
		available: f64,
	},
}

/// Classic token bucket that accumulates `rate` tokens per second up to `capacity`.
pub struct TokenBucket {
	capacity: f64,
	rate: f64,
	value: f64,
	checkpoint: OffsetDateTime,
	clock: Arc<dyn Clock>,
}
impl TokenBucket {
	/// Creates a full bucket driven by the system clock.
	pub fn new(capacity: f64, rate: f64) -> Result<Self, TokenBucketError> {
		Self::with_clock(capacity, rate, Arc::new(SystemClock))
	}

	/// Creates a full bucket driven by the provided clock.
	pub fn with_clock(
		capacity: f64,
		rate: f64,
		clock: Arc<dyn Clock>,
	) -> Result<Self, TokenBucketError> {
		if !(rate.is_finite() && rate > 0.) {
			return Err(TokenBucketError::InvalidRate { rate });
		}
		if !(capacity.is_finite() && capacity >= 0.) {
			return Err(TokenBucketError::InvalidCapacity { capacity });
		}

		let checkpoint = clock.now();

		Ok(Self { capacity, rate, value: capacity, checkpoint, clock })
	}

	/// Maximum number of tokens the bucket can hold.
	pub fn capacity(&self) -> f64 {
		self.capacity
	}

	/// Tokens added per second.
	pub fn rate(&self) -> f64 {
		self.rate
	}

	/// Replenishes the bucket for the time elapsed since the last checkpoint and returns the
	/// current number of tokens.
	pub fn get_value(&mut self) -> f64 {
		self.replenish();

		self.value
	}

	/// Takes `n` tokens if they are all available; leaves the bucket untouched otherwise.
	pub fn try_consume(&mut self, n: f64) -> bool {
		self.replenish();

		if n <= self.value {
			self.value -= n;

			true
		} else {
			false
		}
	}

	/// Takes `n` tokens, failing when they are not all available.
	///
	/// Callers are expected to wait out [`get_cooldown`](Self::get_cooldown) first.
	pub fn consume(&mut self, n: f64) -> Result<(), TokenBucketError> {
		if self.try_consume(n) {
			Ok(())
		} else {
			Err(TokenBucketError::Insufficient { requested: n, available: self.value })
		}
	}

	/// Takes up to `n` tokens, never dropping below zero, and reports whether all `n` were
	/// available.
	pub fn hard_consume(&mut self, n: f64) -> bool {
		self.replenish();

		let satisfied = n <= self.value;

		self.value = (self.value - n).max(0.);

		satisfied
	}

	/// Time to wait until `n` tokens are available.
	pub fn get_cooldown(&mut self, n: f64) -> Duration {
		self.replenish();

		let missing = n - self.value;

		if missing <= 0. { Duration::ZERO } else { Duration::seconds_f64(missing / self.rate) }
	}

	fn replenish(&mut self) {
		let now = self.clock.now();
		let elapsed = (now - self.checkpoint).as_seconds_f64();

		if elapsed > 0. {
			self.value = (self.value + elapsed * self.rate).min(self.capacity);
		}

		self.checkpoint = now;
	}
}
impl Debug for TokenBucket {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBucket")
			.field("capacity", &self.capacity)
			.field("rate", &self.rate)
			.field("value", &self.value)
			.field("checkpoint", &self.checkpoint)
			.finish()
	}
}
