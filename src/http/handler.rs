//! Handler trait and middleware composition.
//!
//! A [`Middleware`] takes the next handler and returns a new handler wrapping it.
//! [`HandlerChain`] applies middlewares once, at construction time, so the first layer
//! added is the outermost one and the [`Transport`] sits at the bottom.

pub mod authorized;
pub mod default_headers;
pub mod rate_limited;
pub mod recorded;
pub mod redirects;

pub use authorized::*;
pub use default_headers::*;
pub use rate_limited::*;
pub use recorded::*;
pub use redirects::*;

// self
use crate::{
	_prelude::*,
	http::{Response, SendParams, Transport},
};

/// Boxed future returned by [`Handler::send`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// Shared, type-erased handler.
pub type BoxHandler = Arc<dyn Handler>;

/// Function from "next handler" to a handler wrapping it.
pub type Middleware = Box<dyn FnOnce(BoxHandler) -> BoxHandler + Send>;

/// One unit of the request pipeline.
pub trait Handler
where
	Self: Send + Sync,
{
	/// Processes the request, usually delegating to the next handler.
	fn send(&self, params: SendParams) -> HandlerFuture<'_>;
}

/// Ordered list of middlewares applied around a transport.
#[derive(Default)]
pub struct HandlerChain {
	layers: Vec<Middleware>,
}
impl HandlerChain {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a middleware; earlier layers wrap later ones.
	pub fn layer<M>(mut self, middleware: M) -> Self
	where
		M: 'static + Send + FnOnce(BoxHandler) -> BoxHandler,
	{
		self.layers.push(Box::new(middleware));

		self
	}

	/// Number of middlewares in the chain.
	pub fn len(&self) -> usize {
		self.layers.len()
	}

	/// Whether the chain has no middlewares.
	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// Composes the chain around `transport`.
	pub fn build(self, transport: Arc<dyn Transport>) -> BoxHandler {
		let bottom: BoxHandler = Arc::new(TransportHandler { transport });

		self.layers.into_iter().rev().fold(bottom, |next, layer| layer(next))
	}
}
impl Debug for HandlerChain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HandlerChain").field("layers", &self.layers.len()).finish()
	}
}

/// Bottom of every chain: forwards to the transport and lifts its errors.
struct TransportHandler {
	transport: Arc<dyn Transport>,
}
impl Handler for TransportHandler {
	fn send(&self, params: SendParams) -> HandlerFuture<'_> {
		Box::pin(async move { Ok(self.transport.send(params).await?) })
	}
}
