//! OAuth client identity and its HTTP Basic encoding.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Client id plus optional secret; installed apps have no secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth client id.
	pub client_id: String,
	/// OAuth client secret for confidential (web/script) apps.
	pub client_secret: Option<TokenSecret>,
}
impl ClientCredentials {
	/// Credentials for a confidential client.
	pub fn confidential(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: Some(TokenSecret::new(client_secret)) }
	}

	/// Credentials for a public (installed) client.
	pub fn public(client_id: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: None }
	}

	/// Whether a secret is configured.
	pub fn is_confidential(&self) -> bool {
		self.client_secret.is_some()
	}

	/// `Basic base64(client_id:client_secret)`, with an empty secret for public clients.
	pub fn basic_authorization(&self) -> Result<HeaderValue, ConfigError> {
		let secret = self.client_secret.as_ref().map(TokenSecret::expose).unwrap_or_default();
		let encoded = STANDARD.encode(format!("{}:{secret}", self.client_id));
		let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
			.map_err(|_| ConfigError::InvalidHeader { name: header::AUTHORIZATION.to_string() })?;

		value.set_sensitive(true);

		Ok(value)
	}
}
