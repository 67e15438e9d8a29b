//! Middleware fixing the redirect policy for requests that did not choose one.

// self
use crate::{
	_prelude::*,
	http::{BoxHandler, Handler, HandlerFuture, SendParams},
};

/// Fills in [`SendParams::follow_redirects`] when it is unset.
pub struct Redirects {
	next: BoxHandler,
	follow: bool,
}
impl Redirects {
	/// Middleware constructor for [`crate::http::HandlerChain::layer`].
	pub fn layer(follow: bool) -> impl FnOnce(BoxHandler) -> BoxHandler + Send {
		move |next| Arc::new(Self { next, follow }) as BoxHandler
	}
}
impl Handler for Redirects {
	fn send(&self, mut params: SendParams) -> HandlerFuture<'_> {
		params.follow_redirects.get_or_insert(self.follow);

		self.next.send(params)
	}
}
