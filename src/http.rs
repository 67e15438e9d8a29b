//! Request/response model, the pluggable transport seam, and the handler chain.
//!
//! A request travels through the chain built by [`HandlerChain`] in this order:
//! rate limiting, authorization, response recording, default headers, redirect policy, and
//! finally the [`Transport`].

pub mod handler;
pub mod request;
pub mod response;
pub mod transport;

pub use handler::*;
pub use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
pub use request::*;
pub use response::*;
pub use transport::*;
