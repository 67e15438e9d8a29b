//! Cursor walk over Reddit Listings.
//!
//! A Listing looks like `{"kind": "Listing", "data": {"children": [...], "after": ..,
//! "before": ..}}`. The paginator keeps the last non-null `after`/`before` the server
//! reported and never recomputes them from the items, so a page with zero or one items
//! leaves the cursors exactly as the server sent them.

// self
use crate::{
	_prelude::*,
	client::{RedditHttpClient, RequestOptions},
	error::ResponseContentError,
	http::Response,
};

/// Boxed future returned by [`PageFetcher::fetch_page`].
pub type PageFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + 'a + Send>>;

/// Extracts a per-item cursor from a Listing child.
pub type CursorExtractor = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Cursor parameters for one page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
	/// Fetch items after this fullname.
	pub after: Option<String>,
	/// Fetch items before this fullname.
	pub before: Option<String>,
	/// Maximum items per page.
	pub limit: Option<u32>,
	/// Items already seen, forwarded as Reddit's `count` parameter.
	pub count: u64,
}

/// Fetches one raw Listing document.
pub trait PageFetcher
where
	Self: Send + Sync,
{
	/// Fetches the page described by `request`.
	fn fetch_page(&self, request: PageRequest) -> PageFuture<'_>;
}

/// [`PageFetcher`] issuing `GET` requests for a Listing endpoint through the client.
pub struct ListingFetcher<'c> {
	client: &'c RedditHttpClient,
	path: String,
	params: Vec<(String, String)>,
}
impl<'c> ListingFetcher<'c> {
	/// Creates a fetcher for `path`, e.g. `/r/rust/new`.
	pub fn new(client: &'c RedditHttpClient, path: impl Into<String>) -> Self {
		Self { client, path: path.into(), params: Vec::new() }
	}

	/// Adds a fixed query parameter sent with every page.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}
}
impl PageFetcher for ListingFetcher<'_> {
	fn fetch_page(&self, request: PageRequest) -> PageFuture<'_> {
		Box::pin(async move {
			let mut options = RequestOptions::new();

			options.params.extend(self.params.iter().cloned());

			if let Some(after) = request.after {
				options = options.param("after", after);
			}
			if let Some(before) = request.before {
				options = options.param("before", before);
			}
			if let Some(limit) = request.limit {
				options = options.param("limit", limit.to_string());
			}
			if request.count > 0 {
				options = options.param("count", request.count.to_string());
			}

			self.client.request_json::<Value>(Method::GET, &self.path, options).await
		})
	}
}

/// Direction of travel through a Listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
	/// Follow `after` cursors.
	#[default]
	Forward,
	/// Follow `before` cursors.
	Backward,
}

/// One Listing child.
#[derive(Clone, Debug, PartialEq)]
pub struct PageItem<T> {
	/// Cursor extracted from the child.
	pub cursor: Option<String>,
	/// Thing kind, e.g. `t3`.
	pub kind: Option<String>,
	/// Decoded `data` object.
	pub data: T,
}

/// Forward/backward cursor walk over a Listing endpoint.
pub struct Paginator<F, T = Value> {
	fetcher: F,
	extractor: CursorExtractor,
	direction: Direction,
	limit: Option<u32>,
	after: Option<String>,
	before: Option<String>,
	count: u64,
	last: Option<(bool, bool)>,
	_item: std::marker::PhantomData<fn() -> T>,
}
impl<F, T> Paginator<F, T>
where
	F: PageFetcher,
	T: for<'de> Deserialize<'de>,
{
	/// Creates a forward paginator extracting cursors from `data.name`.
	pub fn new(fetcher: F) -> Self {
		Self {
			fetcher,
			extractor: Arc::new(default_cursor),
			direction: Direction::Forward,
			limit: None,
			after: None,
			before: None,
			count: 0,
			last: None,
			_item: std::marker::PhantomData,
		}
	}

	/// Replaces the per-item cursor extractor.
	pub fn with_extractor(mut self, extractor: CursorExtractor) -> Self {
		self.extractor = extractor;

		self
	}

	/// Sets the page size.
	pub fn with_limit(mut self, limit: u32) -> Self {
		self.limit = Some(limit);

		self
	}

	/// Current `after` cursor.
	pub fn after(&self) -> Option<&str> {
		self.after.as_deref()
	}

	/// Current `before` cursor.
	pub fn before(&self) -> Option<&str> {
		self.before.as_deref()
	}

	/// Items fetched so far.
	pub fn count(&self) -> u64 {
		self.count
	}

	/// Direction of travel.
	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Whether the last page reported an `after` cursor; true before the first fetch.
	pub fn has_after(&self) -> bool {
		self.last.is_none_or(|(after, _)| after)
	}

	/// Whether the last page reported a `before` cursor; true before the first fetch.
	pub fn has_before(&self) -> bool {
		self.last.is_none_or(|(_, before)| before)
	}

	/// Whether another page exists in the direction of travel.
	pub fn next_available(&self) -> bool {
		match self.direction {
			Direction::Forward => self.has_after(),
			Direction::Backward => self.has_before(),
		}
	}

	/// Flips the direction of travel.
	pub fn reverse(&mut self) {
		self.direction = match self.direction {
			Direction::Forward => Direction::Backward,
			Direction::Backward => Direction::Forward,
		};
	}

	/// Clears cursors and the running count.
	pub fn reset(&mut self) {
		self.after = None;
		self.before = None;
		self.count = 0;
		self.last = None;
	}

	/// Fetches the next page in the direction of travel and returns its items.
	pub async fn next_result(&mut self) -> Result<Vec<PageItem<T>>> {
		let request = PageRequest {
			after: (self.direction == Direction::Forward).then(|| self.after.clone()).flatten(),
			before: (self.direction == Direction::Backward).then(|| self.before.clone()).flatten(),
			limit: self.limit,
			count: self.count,
		};
		let listing = self.fetcher.fetch_page(request).await?;
		let after = listing.pointer("/data/after").and_then(Value::as_str).map(str::to_owned);
		let before = listing.pointer("/data/before").and_then(Value::as_str).map(str::to_owned);
		let children =
			listing.pointer("/data/children").and_then(Value::as_array).cloned().unwrap_or_default();
		let mut items = Vec::with_capacity(children.len());

		for child in children {
			let cursor = (self.extractor)(&child);
			let kind = child.get("kind").and_then(Value::as_str).map(str::to_owned);
			let payload = child.get("data").cloned().unwrap_or(Value::Null);
			let data = serde_path_to_error::deserialize(payload).map_err(|source| {
				Error::from(ResponseContentError::Decode {
					status: StatusCode::OK,
					source,
					response: Box::new(Response::new(
						StatusCode::OK,
						HeaderMap::new(),
						child.to_string().into_bytes(),
					)),
				})
			})?;

			items.push(PageItem { cursor, kind, data });
		}

		self.last = Some((after.is_some(), before.is_some()));

		if after.is_some() {
			self.after = after;
		}
		if before.is_some() {
			self.before = before;
		}

		self.count += items.len() as u64;

		Ok(items)
	}
}
impl<F, T> Debug for Paginator<F, T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Paginator")
			.field("direction", &self.direction)
			.field("after", &self.after)
			.field("before", &self.before)
			.field("count", &self.count)
			.finish()
	}
}

/// Default cursor extractor: the child's `data.name` fullname.
pub fn default_cursor(child: &Value) -> Option<String> {
	child.pointer("/data/name").and_then(Value::as_str).map(str::to_owned)
}
