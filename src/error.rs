//! Client-level error types shared by the handler chain, the token machinery, and the
//! top-level client.
//!
//! Handlers raise low-level failures; [`crate::translate`] turns responses into the more
//! specific variants below while keeping the original failure reachable through
//! [`std::error::Error::source`].

// self
use crate::{_prelude::*, http::Response, token_bucket::TokenBucketError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or invocation problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be interpreted.
	#[error(transparent)]
	ResponseContent(#[from] ResponseContentError),
	/// Authentication or authorization failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Reddit reported one or more API-level errors.
	#[error(transparent)]
	Api(#[from] RedditApiError),
	/// Unclassified HTTP status failure.
	#[error(transparent)]
	Status(#[from] StatusError),
}
impl Error {
	/// Returns the response attached to the error, when one exists.
	pub fn response(&self) -> Option<&Response> {
		match self {
			Self::ResponseContent(err) => Some(err.response()),
			Self::Auth(err) => err.status_error().map(StatusError::response),
			Self::Api(err) => err.response.as_deref(),
			Self::Status(err) => Some(err.response()),
			Self::Config(_) | Self::Transport(_) => None,
		}
	}

	/// HTTP status code attached to the error, when one exists.
	pub fn status(&self) -> Option<StatusCode> {
		self.response().map(Response::status)
	}
}

/// Configuration and invocation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured URL cannot be parsed or joined.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL or path.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// User agent is missing or too short to identify the application.
	#[error("User agent `{user_agent}` is invalid: {reason}.")]
	InvalidUserAgent {
		/// Supplied user agent.
		user_agent: String,
		/// Why it was rejected.
		reason: &'static str,
	},
	/// Header name or value cannot be represented on the wire.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name as supplied.
		name: String,
	},
	/// Token endpoint answered in a way that only a wrong endpoint URL explains.
	#[error("The token endpoint {url} returned HTTP {status}; check the configured token URL.")]
	TokenEndpoint {
		/// Token endpoint URL that was called.
		url: String,
		/// Status returned.
		status: StatusCode,
	},
	/// The authorizer has no token client, so tokens cannot be renewed.
	#[error("No token client is configured; the access token cannot be renewed.")]
	MissingTokenClient,
	/// Rate-limit settings cannot build a token bucket.
	#[error("Rate-limit settings are invalid.")]
	RateLimit(#[from] TokenBucketError),
	/// The runtime driving blocking calls could not be started.
	#[error("Blocking runtime could not be started.")]
	Runtime {
		/// Underlying runtime builder failure.
		#[source]
		source: std::io::Error,
	},
	/// API misuse detected before any request was sent.
	#[error("Invalid invocation: {reason}.")]
	InvalidInvocation {
		/// Description of the misuse.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Shorthand for [`ConfigError::InvalidInvocation`].
	pub fn invocation(reason: impl Into<String>) -> Self {
		Self::InvalidInvocation { reason: reason.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures: network errors and timeouts.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request did not complete before its timeout elapsed.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}

	/// Returns `true` for timeouts.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Failures to interpret a response body.
#[derive(Debug, ThisError)]
pub enum ResponseContentError {
	/// Body is not JSON (or not the expected JSON) and no known page was recognized.
	#[error("Response content could not be identified (HTTP {status}).")]
	Unidentified {
		/// Status of the response.
		status: StatusCode,
		/// Response whose body could not be parsed.
		response: Box<Response>,
		/// Parser failure, when decoding was attempted.
		#[source]
		source: Option<serde_json::Error>,
	},
	/// Body is an HTML document, usually an error page served by Reddit or its CDN.
	#[error("Received an HTML document (HTTP {status}): {diagnostic}.")]
	HtmlDocument {
		/// Status of the response.
		status: StatusCode,
		/// Contents of the `<title>` element, if any.
		title: Option<String>,
		/// Short human-readable explanation.
		diagnostic: String,
		/// Response carrying the HTML document.
		response: Box<Response>,
	},
	/// JSON was well-formed but did not match the expected shape.
	#[error("Response JSON does not match the expected shape.")]
	Decode {
		/// Status of the response.
		status: StatusCode,
		/// Structured decoding failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Response whose body failed to decode.
		response: Box<Response>,
	},
}
impl ResponseContentError {
	/// Response the error was raised for.
	pub fn response(&self) -> &Response {
		match self {
			Self::Unidentified { response, .. }
			| Self::HtmlDocument { response, .. }
			| Self::Decode { response, .. } => response,
		}
	}
}

/// Which credential a [`AuthError::Credentials`] failure blames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialsKind {
	/// Client id/secret pair was rejected.
	Client,
	/// Grant payload (password, code, refresh token, ...) was rejected.
	Grant,
}

/// OAuth2 error names defined by RFC 6749 and RFC 6750.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OAuthErrorKind {
	/// `invalid_request`.
	InvalidRequest,
	/// `invalid_client`.
	InvalidClient,
	/// `invalid_grant`.
	InvalidGrant,
	/// `unauthorized_client`.
	UnauthorizedClient,
	/// `unsupported_grant_type`.
	UnsupportedGrantType,
	/// `invalid_scope`.
	InvalidScope,
	/// `access_denied`.
	AccessDenied,
	/// `unsupported_response_type`.
	UnsupportedResponseType,
	/// `server_error`.
	ServerError,
	/// `temporarily_unavailable`.
	TemporarilyUnavailable,
	/// `invalid_token`.
	InvalidToken,
	/// `insufficient_scope`.
	InsufficientScope,
}
impl OAuthErrorKind {
	/// Parses a wire error name; matching is exact, as the RFCs define lowercase names.
	pub fn from_name(name: &str) -> Option<Self> {
		Some(match name {
			"invalid_request" => Self::InvalidRequest,
			"invalid_client" => Self::InvalidClient,
			"invalid_grant" => Self::InvalidGrant,
			"unauthorized_client" => Self::UnauthorizedClient,
			"unsupported_grant_type" => Self::UnsupportedGrantType,
			"invalid_scope" => Self::InvalidScope,
			"access_denied" => Self::AccessDenied,
			"unsupported_response_type" => Self::UnsupportedResponseType,
			"server_error" => Self::ServerError,
			"temporarily_unavailable" => Self::TemporarilyUnavailable,
			"invalid_token" => Self::InvalidToken,
			"insufficient_scope" => Self::InsufficientScope,
			_ => return None,
		})
	}

	/// Returns the wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidRequest => "invalid_request",
			Self::InvalidClient => "invalid_client",
			Self::InvalidGrant => "invalid_grant",
			Self::UnauthorizedClient => "unauthorized_client",
			Self::UnsupportedGrantType => "unsupported_grant_type",
			Self::InvalidScope => "invalid_scope",
			Self::AccessDenied => "access_denied",
			Self::UnsupportedResponseType => "unsupported_response_type",
			Self::ServerError => "server_error",
			Self::TemporarilyUnavailable => "temporarily_unavailable",
			Self::InvalidToken => "invalid_token",
			Self::InsufficientScope => "insufficient_scope",
		}
	}
}
impl Display for OAuthErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Authentication and authorization failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Client or grant credentials were rejected.
	#[error("Credentials were rejected: {message}.")]
	Credentials {
		/// Which credential is at fault.
		kind: CredentialsKind,
		/// Diagnostic derived from the request/response pair.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Token lacks the scope required by the resource.
	#[error("Token lacks the required scope: {message}.")]
	InsufficientScope {
		/// Diagnostic derived from the response.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Resource server rejected the access token.
	#[error("Access token was rejected: {message}.")]
	InvalidToken {
		/// Diagnostic derived from the response.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Reddit refused the request because the User-Agent is blacklisted.
	#[error("User agent is blacklisted: {message}.")]
	BlacklistedUserAgent {
		/// Diagnostic derived from the request/response pair.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Reddit throttled the request because the User-Agent looks like a library default.
	#[error("User agent is too generic: {message}.")]
	FaultyUserAgent {
		/// Diagnostic derived from the request/response pair.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Token endpoint issued a token that is not a bearer token.
	#[error("Unsupported token type `{token_type}`; only bearer tokens are supported.")]
	UnknownTokenType {
		/// Token type reported by the token endpoint.
		token_type: String,
	},
	/// Token endpoint does not accept the grant type.
	#[error("Token endpoint does not support the grant type: {message}.")]
	UnsupportedGrantType {
		/// Diagnostic derived from the response.
		message: String,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Token endpoint returned another RFC-defined OAuth2 error.
	#[error("Token endpoint returned OAuth error `{kind}`{}.", describe(.description))]
	OAuth {
		/// Typed error name.
		kind: OAuthErrorKind,
		/// Optional `error_description`.
		description: Option<String>,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// Token endpoint returned an error name this crate does not know.
	#[error("Token endpoint returned an unrecognized error `{error}`{}.", describe(.description))]
	UnrecognizedOAuthError {
		/// Raw `error` value.
		error: String,
		/// Optional `error_description`.
		description: Option<String>,
		/// Status failure that triggered the classification.
		#[source]
		source: Option<StatusError>,
	},
	/// A request was prepared before any token was obtained.
	#[error("No access token is available to authorize the request.")]
	NoToken,
}
impl AuthError {
	/// Status failure attached to the error, when one exists.
	pub fn status_error(&self) -> Option<&StatusError> {
		match self {
			Self::Credentials { source, .. }
			| Self::InsufficientScope { source, .. }
			| Self::InvalidToken { source, .. }
			| Self::BlacklistedUserAgent { source, .. }
			| Self::FaultyUserAgent { source, .. }
			| Self::UnsupportedGrantType { source, .. }
			| Self::OAuth { source, .. }
			| Self::UnrecognizedOAuthError { source, .. } => source.as_ref(),
			Self::UnknownTokenType { .. } | Self::NoToken => None,
		}
	}
}

fn describe(description: &Option<String>) -> String {
	description.as_ref().map(|text| format!(": {text}")).unwrap_or_default()
}

/// A single normalized Reddit API error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedditErrorItem {
	/// Error code name, e.g. `SUBREDDIT_NOEXIST`.
	pub codename: String,
	/// Human-readable explanation.
	pub detail: String,
	/// Form field the error refers to; empty when not field-specific.
	pub field: String,
}
impl Display for RedditErrorItem {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.codename, self.detail)?;

		if !self.field.is_empty() {
			write!(f, " -> {}", self.field)?;
		}

		Ok(())
	}
}

/// One or more API-level errors reported inside a Reddit response body.
#[derive(Debug, ThisError)]
#[error("Reddit API error: {}.", summarize(.errors))]
pub struct RedditApiError {
	/// Normalized error items.
	pub errors: Vec<RedditErrorItem>,
	/// Response the errors were read from, when available.
	pub response: Option<Box<Response>>,
}
impl RedditApiError {
	/// First error item, when any.
	pub fn first(&self) -> Option<&RedditErrorItem> {
		self.errors.first()
	}

	/// Codename of the first error item, when any.
	pub fn codename(&self) -> Option<&str> {
		self.first().map(|item| item.codename.as_str())
	}
}

fn summarize(errors: &[RedditErrorItem]) -> String {
	match errors {
		[] => "no details".into(),
		[only] => only.to_string(),
		[first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
	}
}

/// HTTP status failure not otherwise classified.
#[derive(Debug, ThisError)]
#[error("HTTP {status} returned by {url}.")]
pub struct StatusError {
	/// Response status.
	pub status: StatusCode,
	/// Request URL, or `<unknown>` when the response has no request attached.
	pub url: String,
	/// `Retry-After` hint for 429 responses.
	pub retry_after: Option<Duration>,
	/// Full response.
	pub response: Box<Response>,
}
impl StatusError {
	/// Builds a status error from a response.
	pub fn new(response: Response) -> Self {
		let url = response
			.request()
			.map(|request| request.url.to_string())
			.unwrap_or_else(|| "<unknown>".into());

		Self { status: response.status(), url, retry_after: None, response: Box::new(response) }
	}

	/// Attaches a `Retry-After` hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Response the error was raised for.
	pub fn response(&self) -> &Response {
		&self.response
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::response;

	#[test]
	fn auth_error_chains_status_error_as_source() {
		let status = StatusError::new(response(401, &[], "{}"));
		let err: Error = AuthError::InvalidToken {
			message: "expired".into(),
			source: Some(status),
		}
		.into();
		let source = StdError::source(&err)
			.expect("Auth errors should expose the status failure as their source.");

		assert!(source.to_string().contains("401"));
		assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
	}

	#[test]
	fn api_error_display_summarizes_items() {
		let err = RedditApiError {
			errors: vec![
				RedditErrorItem {
					codename: "SUBREDDIT_NOEXIST".into(),
					detail: "that subreddit doesn't exist".into(),
					field: "sr".into(),
				},
				RedditErrorItem {
					codename: "NO_TEXT".into(),
					detail: "we need something here".into(),
					field: String::new(),
				},
			],
			response: None,
		};

		assert_eq!(err.codename(), Some("SUBREDDIT_NOEXIST"));
		assert_eq!(
			err.to_string(),
			"Reddit API error: SUBREDDIT_NOEXIST: that subreddit doesn't exist -> sr (and 1 more)."
		);
	}

	#[test]
	fn empty_api_error_has_no_first_item() {
		let err = RedditApiError { errors: Vec::new(), response: None };

		assert!(err.first().is_none());
		assert_eq!(err.codename(), None);
		assert_eq!(err.to_string(), "Reddit API error: no details.");
	}

	#[test]
	fn oauth_error_names_parse_exactly() {
		assert_eq!(OAuthErrorKind::from_name("invalid_grant"), Some(OAuthErrorKind::InvalidGrant));
		assert_eq!(OAuthErrorKind::from_name("INVALID_GRANT"), None);
		assert_eq!(OAuthErrorKind::InsufficientScope.as_str(), "insufficient_scope");
	}
}
