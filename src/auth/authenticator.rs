//! Client credentials bound to Reddit's OAuth endpoints.

// crates.io
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope, basic::BasicClient};
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, Grant, ScopeSet, TokenObtainmentClient},
	clock::Clock,
	error::{ConfigError, CredentialsKind},
	http::{BoxHandler, Payload, Request, SendParams},
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	translate,
};

/// OAuth endpoint URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
	/// Token endpoint, `https://www.reddit.com/api/v1/access_token` by default.
	pub token: Url,
	/// Revocation endpoint, `https://www.reddit.com/api/v1/revoke_token` by default.
	pub revoke: Url,
	/// Authorization page, `https://www.reddit.com/api/v1/authorize` by default.
	pub authorize: Url,
}

/// Lifetime requested from the authorization page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthDuration {
	/// Access token only; expires after an hour.
	Temporary,
	/// Access token plus a refresh token.
	Permanent,
}
impl AuthDuration {
	/// Returns the `duration` query value.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthDuration::Temporary => "temporary",
			AuthDuration::Permanent => "permanent",
		}
	}
}

/// Which kind of token [`Authenticator::revoke_token`] revokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenTypeHint {
	/// Revoke an access token.
	AccessToken,
	/// Revoke a refresh token (and every access token issued from it).
	RefreshToken,
}
impl TokenTypeHint {
	/// Returns the `token_type_hint` form value.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenTypeHint::AccessToken => "access_token",
			TokenTypeHint::RefreshToken => "refresh_token",
		}
	}
}

/// Client credentials plus the endpoints and transport chain used for token traffic.
pub struct Authenticator {
	handler: BoxHandler,
	credentials: ClientCredentials,
	endpoints: AuthEndpoints,
	redirect_uri: Option<Url>,
	timeout: Option<Duration>,
	clock: Arc<dyn Clock>,
}
impl Authenticator {
	/// Creates an authenticator sending token traffic through `handler`.
	pub fn new(
		handler: BoxHandler,
		credentials: ClientCredentials,
		endpoints: AuthEndpoints,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { handler, credentials, endpoints, redirect_uri: None, timeout: None, clock }
	}

	/// Sets the redirect URI registered for the app.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Applies a per-request timeout to token traffic.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Client credentials.
	pub fn credentials(&self) -> &ClientCredentials {
		&self.credentials
	}

	/// Endpoint URLs.
	pub fn endpoints(&self) -> &AuthEndpoints {
		&self.endpoints
	}

	/// Redirect URI, when configured.
	pub fn redirect_uri(&self) -> Option<&Url> {
		self.redirect_uri.as_ref()
	}

	/// Builds a token client exchanging `grant` at the token endpoint.
	pub fn token_client(&self, grant: Grant) -> TokenObtainmentClient {
		TokenObtainmentClient::new(
			self.handler.clone(),
			self.endpoints.token.clone(),
			self.credentials.clone(),
			grant,
			self.clock.clone(),
		)
		.with_timeout(self.timeout)
	}

	/// Builds the URL of the authorization page for the code flow, or for the implicit flow
	/// when `implicit` is set.
	pub fn authorize_url(
		&self,
		duration: AuthDuration,
		scopes: &ScopeSet,
		state: &str,
		implicit: bool,
	) -> Result<Url> {
		let Some(redirect_uri) = self.redirect_uri.clone() else {
			return Err(ConfigError::invocation("a redirect URI is required to authorize").into());
		};

		if implicit && self.credentials.is_confidential() {
			return Err(ConfigError::invocation(
				"only clients without a secret can use the implicit grant flow",
			)
			.into());
		}
		if implicit && duration == AuthDuration::Permanent {
			return Err(ConfigError::invocation(
				"the implicit grant flow only supports temporary access tokens",
			)
			.into());
		}

		let client = BasicClient::new(ClientId::new(self.credentials.client_id.clone()))
			.set_auth_uri(AuthUrl::from_url(self.endpoints.authorize.clone()))
			.set_redirect_uri(RedirectUrl::from_url(redirect_uri));
		let state = state.to_owned();
		let mut request = client
			.authorize_url(move || CsrfToken::new(state))
			.add_scopes(scopes.iter().map(|scope| Scope::new(scope.to_owned())))
			.add_extra_param("duration", duration.as_str());

		if implicit {
			request = request.use_implicit_flow();
		}

		let (url, _) = request.url();

		Ok(url)
	}

	/// Revokes an access or refresh token.
	pub async fn revoke_token(&self, token: &str, hint: Option<TokenTypeHint>) -> Result<()> {
		let span = RequestSpan::new(RequestKind::TokenRevoke, "revoke_token");

		obs::record_request_outcome(RequestKind::TokenRevoke, RequestOutcome::Attempt);

		let result = span
			.instrument(async {
				let mut form = vec![("token".to_owned(), token.to_owned())];

				if let Some(hint) = hint {
					form.push(("token_type_hint".into(), hint.as_str().into()));
				}

				let mut request = Request::new(Method::POST, self.endpoints.revoke.clone())
					.with_payload(Payload::Form(form));

				request.headers.insert(header::AUTHORIZATION, self.credentials.basic_authorization()?);

				let response =
					self.handler.send(SendParams::new(request).with_timeout(self.timeout)).await?;

				translate::raise_for_token_response(
					&response,
					CredentialsKind::Client,
					self.clock.now(),
				)
			})
			.await;

		obs::record_result(RequestKind::TokenRevoke, result)
	}
}
impl Debug for Authenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator")
			.field("credentials", &self.credentials)
			.field("endpoints", &self.endpoints)
			.field("redirect_uri", &self.redirect_uri)
			.finish()
	}
}
