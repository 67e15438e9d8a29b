//! Reddit API client core: OAuth2 token lifecycle, a composable rate-limited handler chain,
//! typed error translation, and Listing pagination over a pluggable HTTP transport.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "blocking")] pub mod blocking;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod paginate;
pub mod token_bucket;
pub mod translate;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		clock::ManualClock,
		error::TransportError,
		http::{Response, SendParams, Transport, TransportFuture},
	};

	/// Scripted reply handed out by [`ScriptedTransport`].
	pub enum ScriptedReply {
		/// Reply with the given response.
		Respond(Response),
		/// Fail with a network error carrying the message.
		Fail(&'static str),
	}

	/// In-memory transport that replays queued replies and records every request it sees.
	#[derive(Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<ScriptedReply>>,
		seen: Mutex<Vec<SendParams>>,
	}
	impl ScriptedTransport {
		/// Queues a JSON response with the given status.
		pub fn push_json(&self, status: u16, body: &str) -> &Self {
			self.push_response(response(status, &[("content-type", "application/json")], body))
		}

		/// Queues an arbitrary response.
		pub fn push_response(&self, response: Response) -> &Self {
			self.replies.lock().push_back(ScriptedReply::Respond(response));

			self
		}

		/// Queues a transport failure.
		pub fn push_failure(&self, message: &'static str) -> &Self {
			self.replies.lock().push_back(ScriptedReply::Fail(message));

			self
		}

		/// Returns every request dispatched so far.
		pub fn seen(&self) -> Vec<SendParams> {
			self.seen.lock().clone()
		}

		/// Number of requests dispatched so far.
		pub fn calls(&self) -> usize {
			self.seen.lock().len()
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, params: SendParams) -> TransportFuture<'_> {
			Box::pin(async move {
				self.seen.lock().push(params.clone());

				match self.replies.lock().pop_front() {
					Some(ScriptedReply::Respond(response)) =>
						Ok(response.with_request(Arc::new(params.request))),
					Some(ScriptedReply::Fail(message)) =>
						Err(TransportError::network(std::io::Error::other(message))),
					None => Err(TransportError::network(std::io::Error::other(
						"Scripted transport has no replies left.",
					))),
				}
			})
		}
	}

	/// Builds a response fixture from a status, header pairs, and a UTF-8 body.
	pub fn response(status: u16, headers: &[(&'static str, &str)], body: &str) -> Response {
		let mut map = HeaderMap::new();

		for (name, value) in headers {
			map.append(
				HeaderName::from_static(name),
				HeaderValue::from_str(value).expect("Header fixture should be a valid value."),
			);
		}

		Response::new(
			StatusCode::from_u16(status).expect("Status fixture should be a valid status code."),
			map,
			body.as_bytes().to_vec(),
		)
	}

	/// Manual clock pinned to a fixed instant.
	pub fn test_clock() -> Arc<ManualClock> {
		Arc::new(ManualClock::new(time::macros::datetime!(2025-01-01 00:00 UTC)))
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
