//! Top-level client: URL resolution, default parameters, retries, and error translation.

// self
use crate::{
	_prelude::*,
	auth::{Authenticator, Authorizer, ClientCredentials, Grant, ScopeSet, Token},
	clock::{Clock, SystemClock},
	config::ClientConfig,
	error::{ConfigError, ResponseContentError},
	http::{
		Authorized, BoxHandler, DefaultHeaders, HandlerChain, Payload, RateLimitSnapshot,
		RateLimited, RateLimiter, Recorded, Recorder, Redirects, Request, Response, SendParams,
		Transport,
	},
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	translate,
};

/// Device id Reddit documents for installed clients that opt out of tracking.
pub const UNTRACKED_DEVICE_ID: &str = "DO_NOT_TRACK_THIS_DEVICE";

const RETRY_STATUSES: [StatusCode; 2] =
	[StatusCode::INTERNAL_SERVER_ERROR, StatusCode::BAD_GATEWAY];

/// Per-request additions to the configured defaults.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Query parameters; they override default parameters with the same key.
	pub params: Vec<(String, String)>,
	/// Headers; they override default headers with the same name.
	pub headers: HeaderMap,
	/// Optional body.
	pub payload: Option<Payload>,
	/// Timeout overriding the configured one.
	pub timeout: Option<Duration>,
}
impl RequestOptions {
	/// Empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a query parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Adds a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sends a form body.
	pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		self.payload = Some(Payload::form(fields));

		self
	}

	/// Sends a JSON body.
	pub fn json(mut self, value: Value) -> Self {
		self.payload = Some(Payload::Json(value));

		self
	}

	/// Sends an arbitrary payload.
	pub fn payload(mut self, payload: Payload) -> Self {
		self.payload = Some(payload);

		self
	}

	/// Overrides the timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}

/// Reddit API client wrapping a transport in the full handler chain.
pub struct RedditHttpClient {
	handler: BoxHandler,
	config: ClientConfig,
	authenticator: Arc<Authenticator>,
	authorizer: Arc<Authorizer>,
	limiter: Arc<RateLimiter>,
	recorder: Arc<Recorder>,
	clock: Arc<dyn Clock>,
}
impl RedditHttpClient {
	/// Starts a builder.
	pub fn builder(
		config: ClientConfig,
		credentials: ClientCredentials,
		transport: Arc<dyn Transport>,
	) -> RedditHttpClientBuilder {
		RedditHttpClientBuilder {
			config,
			credentials,
			transport,
			clock: Arc::new(SystemClock),
			source: TokenSource::Default,
			scopes: None,
		}
	}

	/// Configuration in effect.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Authenticator bound to the configured endpoints.
	pub fn authenticator(&self) -> &Arc<Authenticator> {
		&self.authenticator
	}

	/// Authorizer holding the current token.
	pub fn authorizer(&self) -> &Arc<Authorizer> {
		&self.authorizer
	}

	/// Current rate-limit accounting.
	pub fn rate_limit(&self) -> RateLimitSnapshot {
		self.limiter.snapshot()
	}

	/// Most recent response seen by the chain, including failed ones.
	pub fn last_response(&self) -> Option<Response> {
		self.recorder.last()
	}

	/// Sends a request to `path` (relative to the base URL, or absolute).
	///
	/// Responses with status 500 or 502 are retried up to the configured attempt count,
	/// sleeping `i²` seconds after the `i`-th failed attempt (counting from zero). Verbs
	/// are not distinguished, so non-idempotent requests are retried too.
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<Response> {
		let span = RequestSpan::new(RequestKind::Resource, "request");

		obs::record_request_outcome(RequestKind::Resource, RequestOutcome::Attempt);

		let result = span.instrument(self.dispatch(method, path, options)).await;

		obs::record_result(RequestKind::Resource, result)
	}

	/// Sends a request and decodes the JSON body, raising Reddit API errors found in it.
	pub async fn request_json<T>(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let response = self.request(method, path, options).await?;
		let value = response.json::<Value>()?;

		translate::raise_for_api_errors(&value, &response)?;

		serde_path_to_error::deserialize(value).map_err(|source| {
			ResponseContentError::Decode {
				status: response.status(),
				source,
				response: Box::new(response.clone()),
			}
			.into()
		})
	}

	/// Shorthand for a `GET` returning JSON.
	pub async fn get_json<T>(&self, path: &str, params: &[(&str, &str)]) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let options = params
			.iter()
			.fold(RequestOptions::new(), |options, (key, value)| options.param(*key, *value));

		self.request_json(Method::GET, path, options).await
	}

	async fn dispatch(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response> {
		let mut request = Request::new(method, self.resolve(path)?);

		for (key, value) in self.config.default_params.iter().chain(options.params.iter()) {
			request.set_param(key.as_str(), value.as_str());
		}

		request.headers = options.headers;
		request.payload = options.payload;

		let params = SendParams::new(request).with_timeout(options.timeout.or(self.config.timeout));
		let attempts = self.config.retry_attempts.max(1);
		let mut attempt = 0;
		let response = loop {
			let response = self.handler.send(params.clone()).await?;

			attempt += 1;

			if attempt >= attempts || !RETRY_STATUSES.contains(&response.status()) {
				break response;
			}

			let failed = i64::from(attempt - 1);
			let delay = Duration::seconds(failed * failed);

			obs::record_request_outcome(RequestKind::Resource, RequestOutcome::Retry);
			obs::retry_scheduled(attempt, response.status(), delay);

			self.clock.sleep(delay).await;
		};

		translate::raise_for_resource_response(&response, self.clock.now())?;

		Ok(response)
	}

	fn resolve(&self, path: &str) -> Result<Url> {
		let resolved = if path.starts_with("https://") || path.starts_with("http://") {
			Url::parse(path)
		} else {
			self.config.base_url.join(path.trim_start_matches('/'))
		};

		resolved.map_err(|source| ConfigError::InvalidUrl { url: path.to_owned(), source }.into())
	}
}
impl Debug for RedditHttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedditHttpClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("authorizer", &self.authorizer)
			.field("rate_limit", &self.limiter.snapshot())
			.finish()
	}
}

enum TokenSource {
	Default,
	Grant(Grant),
	Token(Token),
	Authorizer(Arc<Authorizer>),
}

/// Builder for [`RedditHttpClient`].
pub struct RedditHttpClientBuilder {
	config: ClientConfig,
	credentials: ClientCredentials,
	transport: Arc<dyn Transport>,
	clock: Arc<dyn Clock>,
	source: TokenSource,
	scopes: Option<ScopeSet>,
}
impl RedditHttpClientBuilder {
	/// Injects a clock (used for sleeping, rate limiting, and token expiry).
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Obtains tokens with `grant`.
	///
	/// Without a grant, confidential clients use client credentials and public clients use
	/// an untracked installed-client grant, both yielding read-only app tokens.
	pub fn grant(mut self, grant: Grant) -> Self {
		self.source = TokenSource::Grant(grant);

		self
	}

	/// Uses a pre-issued token that cannot be renewed.
	pub fn token(mut self, token: Token) -> Self {
		self.source = TokenSource::Token(token);

		self
	}

	/// Shares an existing authorizer.
	pub fn authorizer(mut self, authorizer: Arc<Authorizer>) -> Self {
		self.source = TokenSource::Authorizer(authorizer);

		self
	}

	/// Requests scopes when obtaining tokens.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Composes the handler chains.
	pub fn build(self) -> Result<RedditHttpClient> {
		let Self { config, credentials, transport, clock, source, scopes } = self;
		let token_handler = HandlerChain::new()
			.layer(DefaultHeaders::layer(config.default_headers.clone()))
			.layer(Redirects::layer(false))
			.build(transport.clone());
		let mut authenticator =
			Authenticator::new(token_handler, credentials, config.auth_endpoints.clone(), clock.clone())
				.with_timeout(config.timeout);

		if let Some(redirect_uri) = config.redirect_uri.clone() {
			authenticator = authenticator.with_redirect_uri(redirect_uri);
		}

		let grant_authorizer = |grant: Grant| {
			let mut client = authenticator.token_client(grant);

			if let Some(scopes) = scopes.clone() {
				client = client.with_scopes(scopes);
			}

			Arc::new(Authorizer::new(Arc::new(client), clock.clone()).with_settings(config.renewal))
		};
		let authorizer = match source {
			TokenSource::Authorizer(authorizer) => authorizer,
			TokenSource::Token(token) => Arc::new(Authorizer::with_token(token)),
			TokenSource::Grant(grant) => grant_authorizer(grant),
			TokenSource::Default if authenticator.credentials().is_confidential() =>
				grant_authorizer(Grant::ClientCredentials),
			TokenSource::Default =>
				grant_authorizer(Grant::InstalledClient { device_id: UNTRACKED_DEVICE_ID.into() }),
		};
		let limiter = Arc::new(
			RateLimiter::new(config.rate_limit.clone(), clock.clone()).map_err(ConfigError::from)?,
		);
		let recorder = Arc::new(Recorder::default());
		let handler = HandlerChain::new()
			.layer(RateLimited::layer(limiter.clone()))
			.layer(Authorized::layer(authorizer.clone()))
			.layer(Recorded::layer(recorder.clone()))
			.layer(DefaultHeaders::layer(config.default_headers.clone()))
			.layer(Redirects::layer(true))
			.build(transport);

		Ok(RedditHttpClient {
			handler,
			config,
			authenticator: Arc::new(authenticator),
			authorizer,
			limiter,
			recorder,
			clock,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedTransport, response, test_clock},
		clock::ManualClock,
		error::AuthError,
	};

	fn client(transport: Arc<ScriptedTransport>) -> (RedditHttpClient, Arc<ManualClock>) {
		let clock = test_clock();
		let config = ClientConfig::builder("linux:reddit-http-tests:v0 (by /u/tester)")
			.build()
			.expect("Test configuration should be valid.");
		let client = RedditHttpClient::builder(
			config,
			ClientCredentials::confidential("client", "secret"),
			transport,
		)
		.clock(clock.clone())
		.token(Token::bearer("preissued"))
		.build()
		.expect("Client should build.");

		(client, clock)
	}

	#[tokio::test]
	async fn retries_502_with_quadratic_backoff() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(502, "{}").push_json(502, "{}").push_json(200, r#"{"ok":true}"#);

		let (client, clock) = client(transport.clone());
		let response = client
			.request(Method::GET, "/api/v1/me", RequestOptions::new())
			.await
			.expect("Third attempt should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(transport.calls(), 3);
		assert_eq!(clock.sleeps(), vec![Duration::ZERO, Duration::seconds(1)]);
	}

	#[tokio::test]
	async fn gives_up_after_five_attempts_without_trailing_sleep() {
		let transport = Arc::new(ScriptedTransport::default());

		for _ in 0..5 {
			transport.push_json(500, "{}");
		}

		let (client, clock) = client(transport.clone());
		let err = client
			.request(Method::POST, "api/comment", RequestOptions::new())
			.await
			.expect_err("Persistent 500s must fail.");

		assert!(matches!(err, Error::Status(_)));
		assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
		assert_eq!(transport.calls(), 5);
		assert_eq!(clock.sleeps(), vec![
			Duration::ZERO,
			Duration::seconds(1),
			Duration::seconds(4),
			Duration::seconds(9),
		]);
	}

	#[tokio::test]
	async fn other_statuses_are_not_retried() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(503, "{}");

		let (client, clock) = client(transport.clone());

		assert!(client.request(Method::GET, "/hot", RequestOptions::new()).await.is_err());
		assert_eq!(transport.calls(), 1);
		assert!(clock.sleeps().is_empty());
	}

	#[tokio::test]
	async fn merges_defaults_with_request_values() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(200, "{}");

		let (client, _clock) = client(transport.clone());

		client
			.request(
				Method::GET,
				"/r/rust/hot",
				RequestOptions::new()
					.param("raw_json", "0")
					.param("limit", "5")
					.header(header::ACCEPT, HeaderValue::from_static("text/plain")),
			)
			.await
			.expect("Request should succeed.");

		let seen = transport.seen();
		let request = &seen[0].request;

		assert_eq!(request.url.as_str(), "https://oauth.reddit.com/r/rust/hot");
		assert_eq!(request.param("raw_json"), Some("0"));
		assert_eq!(request.param("api_type"), Some("json"));
		assert_eq!(request.param("limit"), Some("5"));
		assert_eq!(request.header_str(header::ACCEPT), Some("text/plain"));
		assert_eq!(request.header_str(header::AUTHORIZATION), Some("bearer preissued"));
		assert!(
			request
				.header_str(header::USER_AGENT)
				.is_some_and(|agent| agent.starts_with("linux:reddit-http-tests:v0"))
		);
		assert_eq!(seen[0].follow_redirects, Some(true));
		assert_eq!(seen[0].timeout, Some(Duration::seconds(16)));
	}

	#[tokio::test]
	async fn insufficient_scope_is_translated() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_response(response(
			403,
			&[("www-authenticate", r#"Bearer realm="reddit", error="insufficient_scope""#)],
			"{}",
		));

		let (client, _clock) = client(transport.clone());
		let err = client
			.request(Method::GET, "/api/v1/me/prefs", RequestOptions::new())
			.await
			.expect_err("Scope failures must be raised.");

		assert!(matches!(err, Error::Auth(AuthError::InsufficientScope { .. })));
		assert_eq!(
			client.last_response().map(|response| response.status()),
			Some(StatusCode::FORBIDDEN)
		);
	}

	#[tokio::test]
	async fn request_json_raises_api_errors() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(
			200,
			r#"{"json":{"errors":[["SUBREDDIT_NOEXIST","that subreddit doesn't exist","sr"]]}}"#,
		);

		let (client, _clock) = client(transport);
		let err = client
			.request_json::<Value>(
				Method::POST,
				"/api/submit",
				RequestOptions::new().form([("sr", "nope")]),
			)
			.await
			.expect_err("API errors must be raised.");

		match err {
			Error::Api(err) => {
				assert_eq!(err.codename(), Some("SUBREDDIT_NOEXIST"));
				assert_eq!(err.first().map(|item| item.field.as_str()), Some("sr"));
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
