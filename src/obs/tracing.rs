// self
use crate::{_prelude::*, obs::RequestKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used around client requests.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided request kind + stage.
	pub fn new(kind: RequestKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("reddit_http.request", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event before the client sleeps ahead of another attempt.
pub(crate) fn retry_scheduled(attempt: u32, status: StatusCode, delay: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			attempt,
			status = status.as_u16(),
			delay_ms = delay.whole_milliseconds() as u64,
			"retrying request"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, status, delay);
	}
}

/// Emits a debug event when the rate limiter pauses a request.
pub(crate) fn rate_limit_sleep(delay: Duration, remaining: f64) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			delay_ms = delay.whole_milliseconds() as u64,
			remaining,
			"rate limiter sleeping"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (delay, remaining);
	}
}

/// Emits an event after a token renewal attempt.
pub(crate) fn token_renewal(outcome: Result<Option<OffsetDateTime>, &Error>) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			Ok(renewal_time) => tracing::debug!(?renewal_time, "access token renewed"),
			Err(error) => tracing::warn!(%error, "access token renewal failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = outcome;
	}
}
