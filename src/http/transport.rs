//! Pluggable transport seam plus the reqwest-backed implementation.
//!
//! The pipeline never talks to an HTTP stack directly. Callers construct a [`Transport`]
//! and hand it to [`crate::client::RedditHttpClient`]; the client wraps it in the handler
//! chain. Implementations must be `Send + Sync` so one transport can serve concurrent
//! requests, and the futures they return must be `Send` so the chain can box them.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{Payload, Request, Response},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// Everything a transport needs to perform one exchange.
#[derive(Clone, Debug)]
pub struct SendParams {
	/// Request to send.
	pub request: Request,
	/// Per-request timeout; `None` defers to the transport default.
	pub timeout: Option<Duration>,
	/// Whether 3xx responses should be followed; `None` defers to the transport default.
	pub follow_redirects: Option<bool>,
}
impl SendParams {
	/// Wraps a request with no timeout or redirect preference.
	pub fn new(request: Request) -> Self {
		Self { request, timeout: None, follow_redirects: None }
	}

	/// Sets the timeout.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}
}

/// Sends one HTTP request and returns one HTTP response.
///
/// Non-2xx statuses are responses, not errors; only failures to complete the exchange
/// (timeouts, connection problems) are reported as [`TransportError`].
pub trait Transport
where
	Self: Send + Sync,
{
	/// Performs the exchange.
	fn send(&self, params: SendParams) -> TransportFuture<'_>;
}

/// [`Transport`] backed by two reqwest clients: one following redirects and one that
/// returns 3xx responses as-is.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	follow: ReqwestClient,
	no_redirect: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds both clients with reqwest defaults.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let follow = ReqwestClient::builder().build()?;
		let no_redirect =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self { follow, no_redirect })
	}

	/// Wraps caller-configured clients. `no_redirect` should disable redirect following.
	pub fn with_clients(follow: ReqwestClient, no_redirect: ReqwestClient) -> Self {
		Self { follow, no_redirect }
	}

	fn build(&self, params: &SendParams) -> Result<reqwest::RequestBuilder, TransportError> {
		let request = &params.request;
		let client =
			if params.follow_redirects.unwrap_or(true) { &self.follow } else { &self.no_redirect };
		let mut builder = client
			.request(request.method.clone(), request.url.clone())
			.headers(request.headers.clone());

		if !request.params.is_empty() {
			builder = builder.query(&request.params);
		}
		if let Some(timeout) = params.timeout.filter(|timeout| timeout.is_positive()) {
			builder = builder.timeout(timeout.unsigned_abs());
		}

		builder = match &request.payload {
			None => builder,
			Some(Payload::Form(fields)) => builder.form(fields),
			Some(Payload::Json(value)) => builder
				.header(header::CONTENT_TYPE, "application/json")
				.body(serde_json::to_vec(value).map_err(TransportError::network)?),
			Some(Payload::Multipart(multipart)) => {
				let mut form = reqwest::multipart::Form::new();

				for (name, value) in &multipart.fields {
					form = form.text(name.clone(), value.clone());
				}
				for file in &multipart.files {
					let part = reqwest::multipart::Part::bytes(file.data.clone())
						.file_name(file.filename.clone());
					let part = match &file.content_type {
						Some(content_type) => part.mime_str(content_type)?,
						None => part,
					};

					form = form.part(file.name.clone(), part);
				}

				builder.multipart(form)
			},
			Some(Payload::Bytes { content_type, body }) =>
				builder.header(header::CONTENT_TYPE, content_type.as_str()).body(body.clone()),
		};

		Ok(builder)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, params: SendParams) -> TransportFuture<'_> {
		Box::pin(async move {
			let builder = self.build(&params)?;
			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(Response::new(status, headers, body).with_request(Arc::new(params.request)))
		})
	}
}
