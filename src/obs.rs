//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `reddit_http.request` with the `kind`
//!   (request family) and `stage` (call site) fields, plus debug/warn events for retries,
//!   rate-limit sleeps, and token renewals.
//! - Enable `metrics` to increment the `reddit_http_request_total` counter for every
//!   attempt/success/failure/retry, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request families observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// Resource-server call issued through [`crate::client::RedditHttpClient`].
	Resource,
	/// Token endpoint call issued by a token obtainment client.
	TokenObtain,
	/// Token revocation call.
	TokenRevoke,
}
impl RequestKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::Resource => "resource",
			RequestKind::TokenObtain => "token_obtain",
			RequestKind::TokenRevoke => "token_revoke",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Attempt that is about to be repeated.
	Retry,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
			RequestOutcome::Retry => "retry",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records the final outcome of a fallible operation and hands the result back.
pub(crate) fn record_result<T>(kind: RequestKind, result: Result<T>) -> Result<T> {
	let outcome = if result.is_ok() { RequestOutcome::Success } else { RequestOutcome::Failure };

	record_request_outcome(kind, outcome);

	result
}
