//! Rate limiting middleware combining client-side pacing with Reddit's rate-limit headers.

// self
use crate::{
	_prelude::*,
	clock::Clock,
	http::{BoxHandler, Handler, HandlerFuture, Response, SendParams},
	obs,
	token_bucket::{TokenBucket, TokenBucketError},
};

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";
const HEADER_USED: &str = "x-ratelimit-used";

/// Tuning knobs for [`RateLimiter`].
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimitSettings {
	/// Token bucket capacity (burst size).
	pub bucket_capacity: f64,
	/// Token bucket refill rate in requests per second.
	pub bucket_rate: f64,
	/// Requests assumed to remain before any rate-limit header was seen.
	pub default_remaining: f64,
	/// Window assumed before any rate-limit header was seen.
	pub default_reset: Duration,
	/// Projected per-request waits at or below this value are not honored.
	pub threshold: Duration,
}
impl Default for RateLimitSettings {
	fn default() -> Self {
		Self {
			bucket_capacity: 10.,
			bucket_rate: 1.,
			default_remaining: 300.,
			default_reset: Duration::seconds(600),
			threshold: Duration::seconds(2),
		}
	}
}

/// Snapshot of the server-side rate-limit accounting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimitSnapshot {
	/// Requests left in the current window.
	pub remaining: f64,
	/// Requests used in the current window.
	pub used: u64,
	/// When the current window resets.
	pub reset_at: OffsetDateTime,
	/// Whether the window was reported by the server rather than assumed.
	pub from_headers: bool,
}

#[derive(Debug)]
struct RateLimitState {
	bucket: TokenBucket,
	window: RateLimitSnapshot,
}

/// Shared rate-limit bookkeeping; one instance per client.
#[derive(Debug)]
pub struct RateLimiter {
	settings: RateLimitSettings,
	clock: Arc<dyn Clock>,
	state: Mutex<RateLimitState>,
	gate: AsyncMutex<()>,
}
impl RateLimiter {
	/// Creates a limiter that assumes the default window until headers arrive.
	pub fn new(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Result<Self, TokenBucketError> {
		let bucket =
			TokenBucket::with_clock(settings.bucket_capacity, settings.bucket_rate, clock.clone())?;
		let window = default_window(&settings, clock.now());

		Ok(Self {
			settings,
			clock,
			state: Mutex::new(RateLimitState { bucket, window }),
			gate: AsyncMutex::new(()),
		})
	}

	/// Current server-side accounting.
	pub fn snapshot(&self) -> RateLimitSnapshot {
		self.state.lock().window
	}

	/// Time to wait before the next request may be sent.
	///
	/// Combines the bucket cooldown with the server window: an exhausted window waits for
	/// its reset, and a server-reported window whose projected per-request wait exceeds the
	/// threshold waits that long. Assumed windows only pace through exhaustion.
	pub fn delay(&self) -> Duration {
		let now = self.clock.now();
		let mut state = self.state.lock();
		let cooldown = state.bucket.get_cooldown(1.);
		let until_reset = (state.window.reset_at - now).max(Duration::ZERO);
		let server = if state.window.remaining <= 0. {
			until_reset
		} else if !state.window.from_headers {
			Duration::ZERO
		} else {
			let per_request = Duration::checked_seconds_f64(
				until_reset.as_seconds_f64() / state.window.remaining,
			)
			.unwrap_or(until_reset);

			if per_request > self.settings.threshold { per_request } else { Duration::ZERO }
		};

		cooldown.max(server)
	}

	/// Sleeps for [`delay`](Self::delay) once, then takes one token from the bucket.
	///
	/// Callers queue behind one gate held across the sleep, so each sees the tokens taken
	/// by the callers released before it.
	pub async fn acquire(&self) {
		let _gate = self.gate.lock().await;
		let delay = self.delay();

		if delay.is_positive() {
			obs::rate_limit_sleep(delay, self.snapshot().remaining);

			self.clock.sleep(delay).await;
		}

		self.state.lock().bucket.hard_consume(1.);
	}

	/// Updates the accounting from a response's headers, or by local bookkeeping when the
	/// headers are absent.
	pub fn update(&self, response: &Response) {
		let now = self.clock.now();
		let mut state = self.state.lock();
		let remaining = header_f64(response, HEADER_REMAINING);
		// Resets that do not fit a timestamp leave the pair unusable.
		let reset_at = header_f64(response, HEADER_RESET)
			.and_then(|reset| Duration::checked_seconds_f64(reset.max(0.)))
			.and_then(|reset| now.checked_add(reset));

		if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
			let used = header_f64(response, HEADER_USED)
				.map(|used| used.max(0.) as u64)
				.unwrap_or(state.window.used + 1);

			state.window = RateLimitSnapshot {
				remaining: remaining.max(0.),
				used,
				reset_at,
				from_headers: true,
			};

			return;
		}
		if now >= state.window.reset_at {
			state.window = default_window(&self.settings, now);
		}

		state.window.remaining = (state.window.remaining - 1.).max(0.);
		state.window.used += 1;
	}
}

fn default_window(settings: &RateLimitSettings, now: OffsetDateTime) -> RateLimitSnapshot {
	RateLimitSnapshot {
		remaining: settings.default_remaining,
		used: 0,
		reset_at: now + settings.default_reset,
		from_headers: false,
	}
}

fn header_f64(response: &Response, name: &str) -> Option<f64> {
	response
		.header_str(name)
		.and_then(|value| value.trim().parse::<f64>().ok())
		.filter(|value| value.is_finite())
}

/// Middleware that paces requests through a shared [`RateLimiter`].
pub struct RateLimited {
	next: BoxHandler,
	limiter: Arc<RateLimiter>,
}
impl RateLimited {
	/// Middleware constructor for [`crate::http::HandlerChain::layer`].
	pub fn layer(limiter: Arc<RateLimiter>) -> impl FnOnce(BoxHandler) -> BoxHandler + Send {
		move |next| Arc::new(Self { next, limiter }) as BoxHandler
	}
}
impl Handler for RateLimited {
	fn send(&self, params: SendParams) -> HandlerFuture<'_> {
		Box::pin(async move {
			self.limiter.acquire().await;

			let response = self.next.send(params).await?;

			self.limiter.update(&response);

			Ok(response)
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{response, test_clock},
		clock::{ManualClock, SleepFuture},
	};

	fn limiter(settings: RateLimitSettings) -> (RateLimiter, Arc<ManualClock>) {
		let clock = test_clock();
		let limiter = RateLimiter::new(settings, clock.clone())
			.expect("Default rate-limit settings should be valid.");

		(limiter, clock)
	}

	#[test]
	fn defaults_apply_before_headers_are_seen() {
		let (limiter, clock) = limiter(RateLimitSettings::default());
		let snapshot = limiter.snapshot();

		assert_eq!(snapshot.remaining, 300.);
		assert_eq!(snapshot.reset_at - clock.now(), Duration::seconds(600));
		assert_eq!(limiter.delay(), Duration::ZERO);
	}

	#[test]
	fn assumed_windows_only_pace_through_exhaustion() {
		let settings = RateLimitSettings { default_remaining: 2., ..Default::default() };
		let (limiter, clock) = limiter(settings);

		limiter.update(&response(200, &[], "{}"));

		assert_eq!(limiter.delay(), Duration::ZERO);

		limiter.update(&response(200, &[], "{}"));

		assert_eq!(limiter.delay(), limiter.snapshot().reset_at - clock.now());
	}

	#[test]
	fn headers_replace_the_window() {
		let (limiter, clock) = limiter(RateLimitSettings::default());

		limiter.update(&response(
			200,
			&[("x-ratelimit-remaining", "5.0"), ("x-ratelimit-reset", "50"), ("x-ratelimit-used", "95")],
			"{}",
		));

		let snapshot = limiter.snapshot();

		assert_eq!(snapshot.remaining, 5.);
		assert_eq!(snapshot.used, 95);
		assert_eq!(snapshot.reset_at - clock.now(), Duration::seconds(50));
		// 50s over 5 requests is above the 2s threshold.
		assert_eq!(limiter.delay(), Duration::seconds(10));
	}

	#[test]
	fn out_of_range_resets_fall_back_to_local_bookkeeping() {
		let (limiter, clock) = limiter(RateLimitSettings::default());

		for reset in ["1e300", "3e11"] {
			limiter.update(&response(
				200,
				&[("x-ratelimit-remaining", "10"), ("x-ratelimit-reset", reset)],
				"{}",
			));
		}

		let snapshot = limiter.snapshot();

		assert!(!snapshot.from_headers);
		assert_eq!(snapshot.remaining, 298.);
		assert_eq!(snapshot.reset_at - clock.now(), Duration::seconds(600));
	}

	#[test]
	fn tiny_remaining_waits_at_most_until_reset() {
		let (limiter, _clock) = limiter(RateLimitSettings::default());

		limiter.update(&response(
			200,
			&[("x-ratelimit-remaining", "1e-300"), ("x-ratelimit-reset", "100")],
			"{}",
		));

		assert_eq!(limiter.delay(), Duration::seconds(100));
	}

	#[test]
	fn exhausted_window_waits_for_full_reset() {
		let (limiter, _clock) = limiter(RateLimitSettings::default());

		limiter.update(&response(
			200,
			&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "42")],
			"{}",
		));

		assert_eq!(limiter.delay(), Duration::seconds(42));
	}

	#[test]
	fn missing_headers_decrement_and_restore_defaults_after_reset() {
		let (limiter, clock) = limiter(RateLimitSettings::default());

		limiter.update(&response(200, &[], "{}"));
		limiter.update(&response(200, &[], "{}"));

		assert_eq!(limiter.snapshot().remaining, 298.);
		assert_eq!(limiter.snapshot().used, 2);

		clock.advance(Duration::seconds(601));
		limiter.update(&response(200, &[], "{}"));

		assert_eq!(limiter.snapshot().remaining, 299.);
		assert_eq!(limiter.snapshot().used, 1);
	}

	#[tokio::test]
	async fn acquire_sleeps_once_for_bucket_cooldown() {
		let settings = RateLimitSettings { bucket_capacity: 1., ..Default::default() };
		let (limiter, clock) = limiter(settings);

		limiter.acquire().await;
		limiter.acquire().await;

		assert_eq!(clock.sleeps(), vec![Duration::seconds(1)]);
	}

	#[derive(Debug)]
	struct YieldingClock(ManualClock);
	impl Clock for YieldingClock {
		fn now(&self) -> OffsetDateTime {
			self.0.now()
		}

		fn sleep(&self, duration: Duration) -> SleepFuture {
			let sleep = self.0.sleep(duration);

			Box::pin(async move {
				sleep.await;
				tokio::task::yield_now().await;
			})
		}
	}

	#[tokio::test]
	async fn concurrent_callers_are_paced_one_token_at_a_time() {
		let clock = Arc::new(YieldingClock(ManualClock::new(test_clock().now())));
		let settings = RateLimitSettings { bucket_capacity: 1., ..Default::default() };
		let limiter = RateLimiter::new(settings, clock.clone())
			.expect("Single-token bucket settings should be valid.");
		let start = clock.now();

		// Drains the bucket at t=0.
		limiter.acquire().await;

		let (limiter, clock) = (&limiter, &clock);
		let release = || async move {
			limiter.acquire().await;

			(clock.now() - start).whole_seconds()
		};
		let (a, b, c, d, e) = tokio::join!(release(), release(), release(), release(), release());

		assert_eq!([a, b, c, d, e], [1, 2, 3, 4, 5]);
	}
}
