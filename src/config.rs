//! Client configuration and its validating builder.

// self
use crate::{
	_prelude::*,
	auth::{AuthEndpoints, RenewalSettings},
	error::ConfigError,
	http::RateLimitSettings,
	token_bucket::TokenBucket,
};

/// Resource server base URL.
pub const DEFAULT_BASE_URL: &str = "https://oauth.reddit.com/";
/// Token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
/// Revocation endpoint.
pub const DEFAULT_REVOKE_URL: &str = "https://www.reddit.com/api/v1/revoke_token";
/// Authorization page.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";

const MIN_USER_AGENT_LEN: usize = 7;
const USER_AGENT_SUFFIX: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Full User-Agent sent with every request, including the crate suffix.
	pub user_agent: HeaderValue,
	/// Base URL relative request paths resolve against.
	pub base_url: Url,
	/// OAuth endpoints.
	pub auth_endpoints: AuthEndpoints,
	/// Redirect URI registered for the app, used by the code and implicit flows.
	pub redirect_uri: Option<Url>,
	/// Query parameters added to every resource request; request values win.
	pub default_params: Vec<(String, String)>,
	/// Headers added to every request unless the request sets them.
	pub default_headers: HeaderMap,
	/// Per-request timeout.
	pub timeout: Option<Duration>,
	/// Total attempts for requests answered with 500 or 502.
	pub retry_attempts: u32,
	/// Rate limiter tuning.
	pub rate_limit: RateLimitSettings,
	/// Token renewal timing.
	pub renewal: RenewalSettings,
}
impl ClientConfig {
	/// Starts a builder with the mandatory user agent.
	pub fn builder(user_agent: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(user_agent)
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	user_agent: String,
	base_url: Option<Url>,
	token_url: Option<Url>,
	revoke_url: Option<Url>,
	authorize_url: Option<Url>,
	redirect_uri: Option<Url>,
	params: Vec<(String, String)>,
	headers: Vec<(String, String)>,
	timeout: Option<Duration>,
	retry_attempts: u32,
	rate_limit: RateLimitSettings,
	renewal: RenewalSettings,
	allow_insecure_endpoints: bool,
}
impl ClientConfigBuilder {
	const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
	const DEFAULT_TIMEOUT: Duration = Duration::seconds(16);

	/// Creates a builder with Reddit's production endpoints.
	pub fn new(user_agent: impl Into<String>) -> Self {
		Self {
			user_agent: user_agent.into(),
			base_url: None,
			token_url: None,
			revoke_url: None,
			authorize_url: None,
			redirect_uri: None,
			params: Vec::new(),
			headers: Vec::new(),
			timeout: Some(Self::DEFAULT_TIMEOUT),
			retry_attempts: Self::DEFAULT_RETRY_ATTEMPTS,
			rate_limit: RateLimitSettings::default(),
			renewal: RenewalSettings::default(),
			allow_insecure_endpoints: false,
		}
	}

	/// Overrides the resource server base URL.
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: Url) -> Self {
		self.token_url = Some(url);

		self
	}

	/// Overrides the revocation endpoint.
	pub fn revoke_url(mut self, url: Url) -> Self {
		self.revoke_url = Some(url);

		self
	}

	/// Overrides the authorization page.
	pub fn authorize_url(mut self, url: Url) -> Self {
		self.authorize_url = Some(url);

		self
	}

	/// Sets the redirect URI registered for the app. Loopback `http` URIs are allowed.
	pub fn redirect_uri(mut self, url: Url) -> Self {
		self.redirect_uri = Some(url);

		self
	}

	/// Adds a default query parameter, replacing an earlier value for the same key.
	pub fn default_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Adds a default header.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the per-request timeout; `None` defers to the transport.
	pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Sets the total attempts for 500/502 responses (at least one).
	pub fn retry_attempts(mut self, attempts: u32) -> Self {
		self.retry_attempts = attempts.max(1);

		self
	}

	/// Overrides the rate limiter tuning.
	pub fn rate_limit(mut self, settings: RateLimitSettings) -> Self {
		self.rate_limit = settings;

		self
	}

	/// Overrides the token renewal timing.
	pub fn renewal(mut self, settings: RenewalSettings) -> Self {
		self.renewal = settings;

		self
	}

	/// Permits plain `http` endpoints, for local mock servers only.
	pub fn allow_insecure_endpoints(mut self, allow: bool) -> Self {
		self.allow_insecure_endpoints = allow;

		self
	}

	/// Validates the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let user_agent = validate_user_agent(&self.user_agent)?;
		let mut base_url = self.base_url.map_or_else(|| parse_url(DEFAULT_BASE_URL), Ok)?;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let auth_endpoints = AuthEndpoints {
			token: self.token_url.map_or_else(|| parse_url(DEFAULT_TOKEN_URL), Ok)?,
			revoke: self.revoke_url.map_or_else(|| parse_url(DEFAULT_REVOKE_URL), Ok)?,
			authorize: self.authorize_url.map_or_else(|| parse_url(DEFAULT_AUTHORIZE_URL), Ok)?,
		};

		if !self.allow_insecure_endpoints {
			validate_endpoint("base", &base_url)?;
			validate_endpoint("token", &auth_endpoints.token)?;
			validate_endpoint("revocation", &auth_endpoints.revoke)?;
			validate_endpoint("authorization", &auth_endpoints.authorize)?;
		}

		// Surfaces invalid bucket parameters at build time instead of first use.
		TokenBucket::new(self.rate_limit.bucket_capacity, self.rate_limit.bucket_rate)?;

		let mut default_params = vec![
			("raw_json".to_owned(), "1".to_owned()),
			("api_type".to_owned(), "json".to_owned()),
		];

		for (key, value) in self.params {
			match default_params.iter_mut().find(|(existing, _)| *existing == key) {
				Some(slot) => slot.1 = value,
				None => default_params.push((key, value)),
			}
		}

		let mut default_headers = HeaderMap::new();

		for (name, value) in self.headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let header_value = HeaderValue::from_str(&value).map_err(|_| invalid())?;

			default_headers.insert(header_name, header_value);
		}

		default_headers.insert(header::USER_AGENT, user_agent.clone());

		Ok(ClientConfig {
			user_agent,
			base_url,
			auth_endpoints,
			redirect_uri: self.redirect_uri,
			default_params,
			default_headers,
			timeout: self.timeout,
			retry_attempts: self.retry_attempts,
			rate_limit: self.rate_limit,
			renewal: self.renewal,
		})
	}
}

fn validate_user_agent(user_agent: &str) -> Result<HeaderValue, ConfigError> {
	let trimmed = user_agent.trim();
	let invalid = |reason| ConfigError::InvalidUserAgent { user_agent: user_agent.to_owned(), reason };

	if trimmed.chars().filter(|c| !c.is_whitespace()).count() < MIN_USER_AGENT_LEN {
		return Err(invalid("it must contain at least 7 visible characters"));
	}

	HeaderValue::from_str(&format!("{trimmed} {USER_AGENT_SUFFIX}"))
		.map_err(|_| invalid("it contains characters not allowed in an HTTP header"))
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	if url.scheme() != "https" {
		Err(ConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_point_at_reddit() {
		let config = ClientConfig::builder("linux:my-bot:v1 (by /u/someone)")
			.build()
			.expect("Default configuration should be valid.");

		assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
		assert_eq!(config.auth_endpoints.token.as_str(), DEFAULT_TOKEN_URL);
		assert_eq!(config.retry_attempts, 5);
		assert_eq!(config.default_params, vec![
			("raw_json".to_owned(), "1".to_owned()),
			("api_type".to_owned(), "json".to_owned()),
		]);
		assert!(
			config
				.user_agent
				.to_str()
				.expect("User agent should be ASCII.")
				.ends_with(&format!(" reddit-http/{}", env!("CARGO_PKG_VERSION")))
		);
	}

	#[test]
	fn short_user_agents_are_rejected() {
		for user_agent in ["", "   ", "a b c d", "bot"] {
			assert!(matches!(
				ClientConfig::builder(user_agent).build(),
				Err(ConfigError::InvalidUserAgent { .. })
			));
		}
	}

	#[test]
	fn endpoints_must_use_https_unless_relaxed() {
		let local = Url::parse("http://127.0.0.1:8080/").expect("Fixture URL should parse.");
		let err = ClientConfig::builder("my-test-agent")
			.base_url(local.clone())
			.build()
			.expect_err("Plain HTTP must be rejected.");

		assert!(matches!(err, ConfigError::InsecureEndpoint { endpoint: "base", .. }));
		assert!(
			ClientConfig::builder("my-test-agent")
				.base_url(local)
				.allow_insecure_endpoints(true)
				.build()
				.is_ok()
		);
	}

	#[test]
	fn base_url_gains_a_trailing_slash_and_params_override() {
		let config = ClientConfig::builder("my-test-agent")
			.base_url(Url::parse("https://example.com/api").expect("Fixture URL should parse."))
			.default_param("raw_json", "0")
			.default_param("sr_detail", "true")
			.build()
			.expect("Configuration should be valid.");

		assert_eq!(config.base_url.as_str(), "https://example.com/api/");
		assert_eq!(config.default_params[0], ("raw_json".to_owned(), "0".to_owned()));
		assert_eq!(config.default_params[2], ("sr_detail".to_owned(), "true".to_owned()));
	}

	#[test]
	fn invalid_rate_limits_fail_the_build() {
		let settings = RateLimitSettings { bucket_rate: 0., ..Default::default() };

		assert!(matches!(
			ClientConfig::builder("my-test-agent").rate_limit(settings).build(),
			Err(ConfigError::RateLimit(_))
		));
	}
}
