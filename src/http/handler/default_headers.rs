//! Middleware adding headers the caller did not set.

// self
use crate::{
	_prelude::*,
	http::{BoxHandler, Handler, HandlerFuture, SendParams},
};

/// Inserts each configured header unless the request already carries it.
pub struct DefaultHeaders {
	next: BoxHandler,
	headers: HeaderMap,
}
impl DefaultHeaders {
	/// Middleware constructor for [`crate::http::HandlerChain::layer`].
	pub fn layer(headers: HeaderMap) -> impl FnOnce(BoxHandler) -> BoxHandler + Send {
		move |next| Arc::new(Self { next, headers }) as BoxHandler
	}
}
impl Handler for DefaultHeaders {
	fn send(&self, mut params: SendParams) -> HandlerFuture<'_> {
		for (name, value) in &self.headers {
			if !params.request.headers.contains_key(name) {
				params.request.headers.insert(name.clone(), value.clone());
			}
		}

		self.next.send(params)
	}
}
