//! Immutable response value returned by transports and handlers.

// crates.io
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ResponseContentError, http::Request};

/// Completed HTTP response; never mutated after construction.
#[derive(Clone, Debug)]
pub struct Response {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
	request: Option<Arc<Request>>,
}
impl Response {
	/// Creates a response without a back-reference to its request.
	pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
		Self { status, headers, body, request: None }
	}

	/// Attaches the request that produced this response.
	pub fn with_request(mut self, request: Arc<Request>) -> Self {
		self.request = Some(request);

		self
	}

	/// Status code.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Originating request, when the transport recorded it.
	pub fn request(&self) -> Option<&Request> {
		self.request.as_deref()
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Returns a header value when it is valid visible ASCII.
	pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Whether the `Content-Type` header announces JSON.
	pub fn is_json(&self) -> bool {
		self.header_str(header::CONTENT_TYPE)
			.map(|value| value.to_ascii_lowercase().contains("json"))
			.unwrap_or(false)
	}

	/// `Retry-After` hint as a relative duration, accepting delta-seconds or an HTTP date.
	pub fn retry_after(&self, now: OffsetDateTime) -> Option<Duration> {
		let raw = self.header_str(header::RETRY_AFTER)?.trim();

		if let Ok(secs) = raw.parse::<u64>() {
			return i64::try_from(secs).ok().map(Duration::seconds);
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta = moment - now;

			if delta.is_positive() {
				return Some(delta);
			}
		}

		None
	}

	/// Parses the body as an untyped JSON document.
	pub fn json_value(&self) -> Result<Value, serde_json::Error> {
		serde_json::from_slice(&self.body)
	}

	/// Decodes the body into `T`, reporting the JSON path of any mismatch.
	pub fn json<T>(&self) -> Result<T, ResponseContentError>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			if source.inner().is_data() {
				ResponseContentError::Decode {
					status: self.status,
					source,
					response: Box::new(self.clone()),
				}
			} else {
				ResponseContentError::Unidentified {
					status: self.status,
					response: Box::new(self.clone()),
					source: Some(source.into_inner()),
				}
			}
		})
	}
}
