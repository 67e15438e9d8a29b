//! Synchronous facade over [`RedditHttpClient`] and [`Paginator`].
//!
//! Each call runs to completion on the calling thread through a private current-thread
//! runtime, so a blocking client never overlaps its own requests. Do not call these methods
//! from inside an async runtime.

// crates.io
use tokio::runtime::{Builder, Runtime};
// self
use crate::{
	_prelude::*,
	client::{RedditHttpClient, RequestOptions},
	error::ConfigError,
	http::{RateLimitSnapshot, Response},
	paginate::{ListingFetcher, PageItem, Paginator},
};

/// Blocking wrapper around [`RedditHttpClient`].
pub struct BlockingClient {
	inner: RedditHttpClient,
	runtime: Runtime,
}
impl BlockingClient {
	/// Wraps an async client.
	pub fn new(inner: RedditHttpClient) -> Result<Self, ConfigError> {
		let runtime = Builder::new_current_thread()
			.enable_all()
			.build()
			.map_err(|source| ConfigError::Runtime { source })?;

		Ok(Self { inner, runtime })
	}

	/// Underlying async client.
	pub fn inner(&self) -> &RedditHttpClient {
		&self.inner
	}

	/// See [`RedditHttpClient::request`].
	pub fn request(&self, method: Method, path: &str, options: RequestOptions) -> Result<Response> {
		self.runtime.block_on(self.inner.request(method, path, options))
	}

	/// See [`RedditHttpClient::request_json`].
	pub fn request_json<T>(&self, method: Method, path: &str, options: RequestOptions) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		self.runtime.block_on(self.inner.request_json(method, path, options))
	}

	/// See [`RedditHttpClient::last_response`].
	pub fn last_response(&self) -> Option<Response> {
		self.inner.last_response()
	}

	/// See [`RedditHttpClient::rate_limit`].
	pub fn rate_limit(&self) -> RateLimitSnapshot {
		self.inner.rate_limit()
	}

	/// Starts a blocking walk over the Listing at `path`.
	pub fn listing<T>(&self, path: impl Into<String>) -> BlockingPaginator<'_, T>
	where
		T: for<'de> Deserialize<'de>,
	{
		BlockingPaginator {
			inner: Paginator::new(ListingFetcher::new(&self.inner, path)),
			runtime: &self.runtime,
		}
	}
}
impl Debug for BlockingClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BlockingClient").field("inner", &self.inner).finish()
	}
}

/// Blocking wrapper around a client-backed [`Paginator`].
pub struct BlockingPaginator<'c, T = Value> {
	inner: Paginator<ListingFetcher<'c>, T>,
	runtime: &'c Runtime,
}
impl<'c, T> BlockingPaginator<'c, T>
where
	T: for<'de> Deserialize<'de>,
{
	/// Sets the page size.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.inner = self.inner.with_limit(limit);

		self
	}

	/// See [`Paginator::next_result`].
	pub fn next_result(&mut self) -> Result<Vec<PageItem<T>>> {
		self.runtime.block_on(self.inner.next_result())
	}

	/// See [`Paginator::next_available`].
	pub fn next_available(&self) -> bool {
		self.inner.next_available()
	}

	/// See [`Paginator::reverse`].
	pub fn reverse(&mut self) {
		self.inner.reverse();
	}

	/// See [`Paginator::reset`].
	pub fn reset(&mut self) {
		self.inner.reset();
	}

	/// Underlying async paginator.
	pub fn inner(&self) -> &Paginator<ListingFetcher<'c>, T> {
		&self.inner
	}
}
