//! Token endpoint client: posts one grant and returns the issued token.

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, Grant, ScopeSet, Token},
	clock::Clock,
	error::CredentialsKind,
	http::{BoxHandler, Payload, Request, Response, SendParams},
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	translate,
};

/// Boxed future returned by [`TokenClient::fetch_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Token>> + 'a + Send>>;

/// Source of fresh tokens for an [`crate::auth::Authorizer`].
pub trait TokenClient
where
	Self: Send + Sync,
{
	/// Obtains a new token.
	fn fetch_token(&self) -> TokenFuture<'_>;
}

/// Posts a [`Grant`] to the token endpoint with HTTP Basic client authentication.
pub struct TokenObtainmentClient {
	handler: BoxHandler,
	url: Url,
	credentials: ClientCredentials,
	grant: Grant,
	scopes: Option<ScopeSet>,
	timeout: Option<Duration>,
	clock: Arc<dyn Clock>,
}
impl TokenObtainmentClient {
	/// Creates a client that sends through `handler` to the token endpoint at `url`.
	pub fn new(
		handler: BoxHandler,
		url: Url,
		credentials: ClientCredentials,
		grant: Grant,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { handler, url, credentials, grant, scopes: None, timeout: None, clock }
	}

	/// Requests the given scopes (sent as the `scope` form field).
	pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = Some(scopes);

		self
	}

	/// Applies a per-request timeout.
	pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Grant this client exchanges.
	pub fn grant(&self) -> &Grant {
		&self.grant
	}

	/// Posts the grant and returns the decoded JSON object.
	pub async fn fetch_data(&self) -> Result<serde_json::Map<String, Value>> {
		let response = self.exchange().await?;

		Ok(response.json()?)
	}

	async fn exchange(&self) -> Result<Response> {
		let span = RequestSpan::new(RequestKind::TokenObtain, "exchange");

		obs::record_request_outcome(RequestKind::TokenObtain, RequestOutcome::Attempt);

		let result = span
			.instrument(async {
				let mut form = self.grant.form();

				if let Some(scopes) = self.scopes.as_ref().filter(|scopes| !scopes.is_empty()) {
					form.push(("scope".into(), scopes.normalized()));
				}

				let mut request = Request::new(Method::POST, self.url.clone())
					.with_payload(Payload::Form(form));

				request.headers.insert(header::AUTHORIZATION, self.credentials.basic_authorization()?);

				let response =
					self.handler.send(SendParams::new(request).with_timeout(self.timeout)).await?;
				let kind = if self.grant.carries_user_credentials() {
					CredentialsKind::Grant
				} else {
					CredentialsKind::Client
				};

				translate::raise_for_token_response(&response, kind, self.clock.now())?;

				Ok::<_, Error>(response)
			})
			.await;

		obs::record_result(RequestKind::TokenObtain, result)
	}
}
impl TokenClient for TokenObtainmentClient {
	fn fetch_token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let response = self.exchange().await?;

			Ok(response.json::<Token>()?)
		})
	}
}
impl Debug for TokenObtainmentClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenObtainmentClient")
			.field("url", &self.url.as_str())
			.field("credentials", &self.credentials)
			.field("grant", &self.grant.grant_type())
			.field("scopes", &self.scopes)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedTransport, test_clock},
		error::AuthError,
		http::HandlerChain,
	};

	fn client(transport: Arc<ScriptedTransport>, grant: Grant) -> TokenObtainmentClient {
		TokenObtainmentClient::new(
			HandlerChain::new().build(transport),
			Url::parse("https://www.reddit.com/api/v1/access_token")
				.expect("Fixture URL should parse."),
			ClientCredentials::confidential("client", "secret"),
			grant,
			test_clock(),
		)
	}

	#[tokio::test]
	async fn fetch_token_posts_grant_form() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(
			200,
			r#"{"access_token":"abc","token_type":"bearer","expires_in":3600,"scope":"read"}"#,
		);

		let token = client(transport.clone(), Grant::ClientCredentials)
			.with_scopes(ScopeSet::new(["read"]).expect("Scope should be valid."))
			.fetch_token()
			.await
			.expect("Token exchange should succeed.");
		let seen = transport.seen();
		let request = &seen[0].request;

		assert_eq!(token.access_token.expose(), "abc");
		assert_eq!(request.method, Method::POST);
		assert_eq!(
			request.payload.as_ref().and_then(Payload::form_fields),
			Some(
				&[
					("grant_type".to_owned(), "client_credentials".to_owned()),
					("scope".to_owned(), "read".to_owned())
				][..]
			)
		);
	}

	#[tokio::test]
	async fn rejected_refresh_token_blames_the_grant() {
		let transport = Arc::new(ScriptedTransport::default());

		transport.push_json(400, r#"{"error":"invalid_request"}"#);

		let err = client(transport, Grant::RefreshToken { refresh_token: "stale".into() })
			.fetch_token()
			.await
			.expect_err("Rejected grants must fail.");

		assert!(matches!(
			err,
			Error::Auth(AuthError::Credentials { kind: CredentialsKind::Grant, .. })
		));
	}
}
