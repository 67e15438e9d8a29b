//! Token value returned by the token endpoint.

pub mod secret;

pub use secret::*;

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Immutable OAuth2 token; renewals replace it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Bearer credential sent to the resource server.
	pub access_token: TokenSecret,
	/// Token type reported by the token endpoint, normally `bearer`.
	pub token_type: String,
	/// Lifetime in seconds, when reported.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Refresh token for permanent authorizations.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Space-delimited scopes granted.
	#[serde(default)]
	pub scope: Option<String>,
}
impl Token {
	/// Creates a bearer token without expiry, refresh token, or scope.
	pub fn bearer(access_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			token_type: "bearer".into(),
			expires_in: None,
			refresh_token: None,
			scope: None,
		}
	}

	/// Sets the lifetime in seconds.
	pub fn with_expires_in(mut self, expires_in: i64) -> Self {
		self.expires_in = Some(expires_in);

		self
	}

	/// Whether the token type is `bearer`, ignoring ASCII case.
	pub fn is_bearer(&self) -> bool {
		self.token_type.eq_ignore_ascii_case("bearer")
	}

	/// Lifetime as a [`Duration`], when reported.
	pub fn lifetime(&self) -> Option<Duration> {
		self.expires_in.map(Duration::seconds)
	}

	/// Granted scopes, when reported and well formed.
	pub fn scopes(&self) -> Option<ScopeSet> {
		self.scope.as_deref()?.parse().ok()
	}

	/// `Authorization` header value: `<type> <token>`.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
