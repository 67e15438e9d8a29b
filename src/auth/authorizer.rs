//! Token lifecycle: obtains, holds, and renews the access token used for resource calls.
//!
//! The authorizer moves between three observable states: no token, a valid token, and a
//! token that expired or was rejected by the resource server. Every check-and-renew
//! sequence runs behind one async gate per authorizer, so concurrent callers never issue
//! more than one renewal per invalidation, and new requests wait while a renewal is in
//! flight.

mod metrics;

pub use metrics::*;

// self
use crate::{
	_prelude::*,
	auth::{Authenticator, Token, TokenClient, TokenTypeHint},
	clock::{Clock, SystemClock},
	error::{AuthError, ConfigError},
	http::Request,
	obs,
};

/// Renewal timing knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenewalSettings {
	/// Subtracted from the token lifetime so renewal happens before the server rejects it.
	pub skew: Duration,
	/// Lifetime assumed when the token endpoint omits `expires_in`; `None` means such tokens
	/// never expire locally.
	pub expires_in_fallback: Option<Duration>,
}
impl Default for RenewalSettings {
	fn default() -> Self {
		Self { skew: Duration::seconds(30), expires_in_fallback: None }
	}
}

#[derive(Debug, Default)]
struct AuthorizerState {
	token: Option<Arc<Token>>,
	renewal_time: Option<OffsetDateTime>,
}

/// Holds the current token and renews it through a [`TokenClient`].
pub struct Authorizer {
	token_client: Option<Arc<dyn TokenClient>>,
	state: Mutex<AuthorizerState>,
	gate: AsyncMutex<()>,
	clock: Arc<dyn Clock>,
	settings: RenewalSettings,
	metrics: RenewalMetrics,
}
impl Authorizer {
	/// Creates an authorizer that obtains its first token lazily.
	pub fn new(token_client: Arc<dyn TokenClient>, clock: Arc<dyn Clock>) -> Self {
		Self::build(Some(token_client), clock)
	}

	/// Creates an authorizer around a pre-issued token (e.g. from the implicit flow). It
	/// cannot renew; once the token is rejected callers receive the translated error.
	pub fn with_token(token: Token) -> Self {
		let authorizer = Self::build(None, Arc::new(SystemClock));

		authorizer.state.lock().token = Some(Arc::new(token));

		authorizer
	}

	fn build(token_client: Option<Arc<dyn TokenClient>>, clock: Arc<dyn Clock>) -> Self {
		Self {
			token_client,
			state: Mutex::new(AuthorizerState::default()),
			gate: AsyncMutex::new(()),
			clock,
			settings: RenewalSettings::default(),
			metrics: RenewalMetrics::default(),
		}
	}

	/// Overrides the renewal timing.
	pub fn with_settings(mut self, settings: RenewalSettings) -> Self {
		self.settings = settings;

		self
	}

	/// Current token, if any.
	pub fn token(&self) -> Option<Arc<Token>> {
		self.state.lock().token.clone()
	}

	/// Instant after which the token is renewed; `None` when it never expires locally.
	pub fn renewal_time(&self) -> Option<OffsetDateTime> {
		self.state.lock().renewal_time
	}

	/// Renewal counters.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.metrics
	}

	/// Whether the held token was granted `scope`.
	///
	/// `None` when no token is held or the token endpoint did not report scopes.
	pub fn token_allows(&self, scope: &str) -> Option<bool> {
		let scopes = self.token()?.scopes()?;

		Some(scopes.allows(scope))
	}

	/// Whether a token client is available to renew tokens.
	pub fn can_renew(&self) -> bool {
		self.token_client.is_some()
	}

	/// True when no token is held, or the renewal time has passed.
	pub fn should_renew_token(&self) -> bool {
		let state = self.state.lock();

		state.token.is_none()
			|| state.renewal_time.is_some_and(|renewal_time| self.clock.now() >= renewal_time)
	}

	/// Unconditionally fetches and installs a new token.
	pub async fn renew_token(&self) -> Result<Arc<Token>> {
		let _gate = self.gate.lock().await;

		self.renew_locked().await
	}

	/// Returns a usable token, renewing first when [`should_renew_token`](Self::should_renew_token).
	pub async fn ensure_token(&self) -> Result<Arc<Token>> {
		let _gate = self.gate.lock().await;

		if self.should_renew_token() {
			return self.renew_locked().await;
		}

		self.token().ok_or_else(|| AuthError::NoToken.into())
	}

	/// Renews only if `used` is still the current token; otherwise returns the token another
	/// caller already installed.
	pub async fn renew_if_current(&self, used: &Arc<Token>) -> Result<Arc<Token>> {
		let _gate = self.gate.lock().await;
		let current = self.token();

		match current {
			Some(current) if !Arc::ptr_eq(&current, used) => Ok(current),
			_ => self.renew_locked().await,
		}
	}

	/// Writes `Authorization: <type> <token>` and returns the token used.
	pub fn prepare_request(&self, request: &mut Request) -> Result<Arc<Token>> {
		let token = self.token().ok_or(AuthError::NoToken)?;
		let mut value = HeaderValue::from_str(&token.authorization_value())
			.map_err(|_| ConfigError::InvalidHeader { name: header::AUTHORIZATION.to_string() })?;

		value.set_sensitive(true);
		request.headers.insert(header::AUTHORIZATION, value);

		Ok(token)
	}

	/// Revokes the held token at the revocation endpoint and forgets it.
	///
	/// The refresh token is revoked when present, which also invalidates its access tokens.
	pub async fn revoke(&self, authenticator: &Authenticator) -> Result<()> {
		let _gate = self.gate.lock().await;
		let Some(token) = self.token() else {
			return Err(AuthError::NoToken.into());
		};

		match &token.refresh_token {
			Some(refresh_token) =>
				authenticator
					.revoke_token(refresh_token.expose(), Some(TokenTypeHint::RefreshToken))
					.await?,
			None =>
				authenticator
					.revoke_token(token.access_token.expose(), Some(TokenTypeHint::AccessToken))
					.await?,
		}

		self.clear();

		Ok(())
	}

	/// Forgets the held token without contacting Reddit.
	pub fn clear(&self) {
		let mut state = self.state.lock();

		state.token = None;
		state.renewal_time = None;
	}

	async fn renew_locked(&self) -> Result<Arc<Token>> {
		let client = self.token_client.as_ref().ok_or(ConfigError::MissingTokenClient)?;

		self.metrics.record_attempt();

		let fetched = client.fetch_token().await.and_then(|token| {
			if token.is_bearer() {
				Ok(token)
			} else {
				Err(AuthError::UnknownTokenType { token_type: token.token_type }.into())
			}
		});
		let token = match fetched {
			Ok(token) => Arc::new(token),
			Err(e) => {
				self.metrics.record_failure();
				obs::token_renewal(Err(&e));

				return Err(e);
			},
		};
		// Lifetimes past the representable range never expire locally.
		let renewal_time = token
			.lifetime()
			.or(self.settings.expires_in_fallback)
			.and_then(|lifetime| self.clock.now().checked_add(lifetime))
			.and_then(|expires_at| expires_at.checked_sub(self.settings.skew));

		{
			let mut state = self.state.lock();

			state.token = Some(token.clone());
			state.renewal_time = renewal_time;
		}

		self.metrics.record_success();
		obs::token_renewal(Ok(renewal_time));

		Ok(token)
	}
}
impl Debug for Authorizer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("Authorizer")
			.field("has_token", &state.token.is_some())
			.field("renewal_time", &state.renewal_time)
			.field("can_renew", &self.token_client.is_some())
			.field("settings", &self.settings)
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use super::*;
	use crate::{_preludet::test_clock, auth::TokenFuture, clock::ManualClock};

	#[derive(Default)]
	struct QueuedTokens {
		tokens: Mutex<VecDeque<Token>>,
		calls: AtomicUsize,
	}
	impl QueuedTokens {
		fn with(tokens: impl IntoIterator<Item = Token>) -> Arc<Self> {
			Arc::new(Self { tokens: Mutex::new(tokens.into_iter().collect()), calls: AtomicUsize::new(0) })
		}
	}
	impl TokenClient for QueuedTokens {
		fn fetch_token(&self) -> TokenFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let next = self.tokens.lock().pop_front();

			Box::pin(async move { next.ok_or_else(|| AuthError::NoToken.into()) })
		}
	}

	fn authorizer(client: Arc<QueuedTokens>) -> (Authorizer, Arc<ManualClock>) {
		let clock = test_clock();

		(Authorizer::new(client, clock.clone()), clock)
	}

	#[tokio::test]
	async fn renewal_time_subtracts_skew_from_lifetime() {
		let (authorizer, clock) =
			authorizer(QueuedTokens::with([Token::bearer("a").with_expires_in(3600)]));

		assert!(authorizer.should_renew_token());

		authorizer.renew_token().await.expect("Renewal should succeed.");

		assert_eq!(
			authorizer.renewal_time(),
			Some(clock.now() + Duration::seconds(3600) - Duration::seconds(30))
		);
		assert!(!authorizer.should_renew_token());

		clock.advance(Duration::seconds(3570));

		assert!(authorizer.should_renew_token());
	}

	#[tokio::test]
	async fn missing_expiry_never_expires_without_fallback() {
		let (authorizer, _clock) = authorizer(QueuedTokens::with([Token::bearer("a")]));

		authorizer.renew_token().await.expect("Renewal should succeed.");

		assert_eq!(authorizer.renewal_time(), None);
		assert!(!authorizer.should_renew_token());
	}

	#[tokio::test]
	async fn unrepresentable_expiry_never_expires() {
		let token: Token = serde_json::from_str(
			r#"{"access_token":"a","token_type":"bearer","expires_in":9223372036854775807}"#,
		)
		.expect("Token fixture should decode.");
		let (authorizer, _clock) = authorizer(QueuedTokens::with([token]));

		authorizer.renew_token().await.expect("Renewal should succeed.");

		assert_eq!(authorizer.renewal_time(), None);
		assert!(!authorizer.should_renew_token());
	}

	#[tokio::test]
	async fn missing_expiry_uses_fallback_when_configured() {
		let (authorizer, clock) = authorizer(QueuedTokens::with([Token::bearer("a")]));
		let authorizer = authorizer.with_settings(RenewalSettings {
			skew: Duration::seconds(10),
			expires_in_fallback: Some(Duration::minutes(5)),
		});

		authorizer.renew_token().await.expect("Renewal should succeed.");

		assert_eq!(authorizer.renewal_time(), Some(clock.now() + Duration::seconds(290)));
	}

	#[tokio::test]
	async fn token_allows_checks_granted_scopes() {
		let mut token = Token::bearer("a");

		token.scope = Some("identity read".into());

		let (authorizer, _clock) = authorizer(QueuedTokens::with([token]));

		assert_eq!(authorizer.token_allows("read"), None);

		authorizer.ensure_token().await.expect("Token should be obtained.");

		assert_eq!(authorizer.token_allows("read"), Some(true));
		assert_eq!(authorizer.token_allows("submit"), Some(false));
		assert_eq!(Authorizer::with_token(Token::bearer("b")).token_allows("read"), None);
	}

	#[tokio::test]
	async fn non_bearer_tokens_are_rejected() {
		let mut token = Token::bearer("a");

		token.token_type = "MAC".into();

		let (authorizer, _clock) = authorizer(QueuedTokens::with([token]));
		let err = authorizer.renew_token().await.expect_err("MAC tokens must be rejected.");

		assert!(matches!(err, Error::Auth(AuthError::UnknownTokenType { .. })));
		assert!(authorizer.token().is_none());
		assert_eq!(authorizer.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn missing_token_client_is_a_config_error() {
		let authorizer = Authorizer::with_token(Token::bearer("implicit"));

		assert!(!authorizer.should_renew_token());
		assert!(matches!(
			authorizer.renew_token().await,
			Err(Error::Config(ConfigError::MissingTokenClient))
		));
	}

	#[tokio::test]
	async fn prepare_request_requires_a_token() {
		let (authorizer, _clock) = authorizer(QueuedTokens::with([Token::bearer("abc")]));
		let mut request = Request::new(
			Method::GET,
			Url::parse("https://oauth.reddit.com/api/v1/me").expect("Fixture URL should parse."),
		);

		assert!(matches!(authorizer.prepare_request(&mut request), Err(Error::Auth(AuthError::NoToken))));

		authorizer.ensure_token().await.expect("First token should be obtained.");
		authorizer.prepare_request(&mut request).expect("Token is now held.");

		assert_eq!(request.header_str(header::AUTHORIZATION), Some("bearer abc"));
	}

	#[tokio::test]
	async fn stale_invalidation_reuses_the_newer_token() {
		let client = QueuedTokens::with([Token::bearer("a"), Token::bearer("b"), Token::bearer("c")]);
		let (authorizer, _clock) = authorizer(client.clone());
		let first = authorizer.ensure_token().await.expect("First token should be obtained.");
		let second = authorizer.renew_if_current(&first).await.expect("Renewal should succeed.");
		// A second caller still holding `first` must not trigger another renewal.
		let reused = authorizer.renew_if_current(&first).await.expect("Reuse should succeed.");

		assert_eq!(second.access_token.expose(), "b");
		assert!(Arc::ptr_eq(&second, &reused));
		assert_eq!(client.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_callers_share_one_renewal() {
		let client = QueuedTokens::with([Token::bearer("a"), Token::bearer("b")]);
		let (authorizer, _clock) = authorizer(client.clone());
		let authorizer = Arc::new(authorizer);
		let handles = (0..8)
			.map(|_| {
				let authorizer = authorizer.clone();

				tokio::spawn(async move { authorizer.ensure_token().await })
			})
			.collect::<Vec<_>>();

		for handle in handles {
			let token = handle.await.expect("Task should not panic.").expect("Token should be shared.");

			assert_eq!(token.access_token.expose(), "a");
		}

		assert_eq!(client.calls.load(Ordering::SeqCst), 1);
		assert_eq!(authorizer.metrics().attempts(), 1);
	}
}
