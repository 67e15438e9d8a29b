//! OAuth2 credentials, grants, tokens, and the token lifecycle.
//!
//! [`Authenticator`] owns the client credentials and the token/revoke/authorize endpoints,
//! [`TokenObtainmentClient`] exchanges one [`Grant`] for a [`Token`], and [`Authorizer`]
//! keeps the current token fresh for the [`crate::http::Authorized`] middleware.

pub mod authenticator;
pub mod authorizer;
pub mod credentials;
pub mod grant;
pub mod scope;
pub mod token;
pub mod token_client;

pub use authenticator::*;
pub use authorizer::*;
pub use credentials::*;
pub use grant::*;
pub use scope::*;
pub use token::*;
pub use token_client::*;
