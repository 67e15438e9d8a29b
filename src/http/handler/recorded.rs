//! Middleware keeping the most recent response for diagnostics.

// self
use crate::{
	_prelude::*,
	http::{BoxHandler, Handler, HandlerFuture, Response, SendParams},
};

/// Slot holding the last response seen by a [`Recorded`] handler.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Option<Response>>);
impl Recorder {
	/// Returns a copy of the last recorded response.
	pub fn last(&self) -> Option<Response> {
		self.0.lock().clone()
	}

	/// Drops the recorded response.
	pub fn clear(&self) {
		self.0.lock().take();
	}

	fn store(&self, response: &Response) {
		*self.0.lock() = Some(response.clone());
	}
}

/// Middleware that records every response passing through it.
pub struct Recorded {
	next: BoxHandler,
	recorder: Arc<Recorder>,
}
impl Recorded {
	/// Middleware constructor for [`crate::http::HandlerChain::layer`].
	pub fn layer(recorder: Arc<Recorder>) -> impl FnOnce(BoxHandler) -> BoxHandler + Send {
		move |next| Arc::new(Self { next, recorder }) as BoxHandler
	}
}
impl Handler for Recorded {
	fn send(&self, params: SendParams) -> HandlerFuture<'_> {
		Box::pin(async move {
			let response = self.next.send(params).await?;

			self.recorder.store(&response);

			Ok(response)
		})
	}
}
