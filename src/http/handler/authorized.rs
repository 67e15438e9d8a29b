//! Middleware attaching the bearer token and retrying once after an invalidation.

// self
use crate::{
	_prelude::*,
	auth::Authorizer,
	http::{BoxHandler, Handler, HandlerFuture, SendParams},
	translate,
};

/// Authorizes each request through a shared [`Authorizer`].
///
/// When the resource server answers 401 (or `WWW-Authenticate: error="invalid_token"`),
/// the token used for the request is renewed unless another caller already replaced it,
/// and the request is sent exactly once more. The second answer is returned as-is.
pub struct Authorized {
	next: BoxHandler,
	authorizer: Arc<Authorizer>,
}
impl Authorized {
	/// Middleware constructor for [`crate::http::HandlerChain::layer`].
	pub fn layer(authorizer: Arc<Authorizer>) -> impl FnOnce(BoxHandler) -> BoxHandler + Send {
		move |next| Arc::new(Self { next, authorizer }) as BoxHandler
	}
}
impl Handler for Authorized {
	fn send(&self, params: SendParams) -> HandlerFuture<'_> {
		Box::pin(async move {
			self.authorizer.ensure_token().await?;

			let mut first = params.clone();
			let used = self.authorizer.prepare_request(&mut first.request)?;
			let response = self.next.send(first).await?;

			if !translate::signals_invalid_token(&response) || !self.authorizer.can_renew() {
				return Ok(response);
			}

			self.authorizer.renew_if_current(&used).await?;

			let mut retry = params;

			self.authorizer.prepare_request(&mut retry.request)?;
			self.next.send(retry).await
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{ScriptedTransport, response, test_clock},
		auth::{Token, TokenClient, TokenFuture},
		http::{HandlerChain, Request},
	};

	struct Sequence(Mutex<u32>);
	impl TokenClient for Sequence {
		fn fetch_token(&self) -> TokenFuture<'_> {
			let mut issued = self.0.lock();

			*issued += 1;

			let token = Token::bearer(format!("token-{issued}"));

			Box::pin(async move { Ok(token) })
		}
	}

	fn setup() -> (Arc<ScriptedTransport>, Arc<Authorizer>, BoxHandler) {
		let transport = Arc::new(ScriptedTransport::default());
		let authorizer = Arc::new(Authorizer::new(Arc::new(Sequence(Mutex::new(0))), test_clock()));
		let handler =
			HandlerChain::new().layer(Authorized::layer(authorizer.clone())).build(transport.clone());

		(transport, authorizer, handler)
	}

	fn params() -> SendParams {
		SendParams::new(Request::new(
			Method::GET,
			Url::parse("https://oauth.reddit.com/api/v1/me").expect("Fixture URL should parse."),
		))
	}

	#[tokio::test]
	async fn invalid_token_triggers_exactly_one_renewal() {
		let (transport, authorizer, handler) = setup();

		authorizer.renew_token().await.expect("Initial token should be obtained.");

		let before = authorizer.metrics().attempts();

		transport.push_response(response(
			401,
			&[("www-authenticate", r#"Bearer realm="reddit", error="invalid_token""#)],
			"{}",
		));
		transport.push_json(200, r#"{"name":"spez"}"#);

		let response = handler.send(params()).await.expect("Retried request should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(authorizer.metrics().attempts() - before, 1);

		let seen = transport.seen();

		assert_eq!(seen[0].request.header_str(header::AUTHORIZATION), Some("bearer token-1"));
		assert_eq!(seen[1].request.header_str(header::AUTHORIZATION), Some("bearer token-2"));

		transport.push_json(200, "{}");
		handler.send(params()).await.expect("Follow-up request should succeed.");

		assert_eq!(authorizer.metrics().attempts() - before, 1);
	}

	#[tokio::test]
	async fn second_rejection_is_returned_without_another_retry() {
		let (transport, authorizer, handler) = setup();

		transport.push_json(401, "{}");
		transport.push_json(401, "{}");

		let response = handler.send(params()).await.expect("Rejection is returned, not raised.");

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(transport.calls(), 2);
		// One renewal to obtain the first token, one after the rejection.
		assert_eq!(authorizer.metrics().attempts(), 2);
	}

	#[tokio::test]
	async fn insufficient_scope_is_not_retried() {
		let (transport, _authorizer, handler) = setup();

		transport.push_response(response(
			403,
			&[("www-authenticate", r#"Bearer realm="reddit", error="insufficient_scope""#)],
			"{}",
		));

		let response = handler.send(params()).await.expect("Rejection is returned, not raised.");

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
		assert_eq!(transport.calls(), 1);
	}
}
