//! Mutable request descriptor handed to the handler chain.

// self
use crate::_prelude::*;

/// One outgoing HTTP request; handlers may mutate it before it reaches the transport.
#[derive(Clone, Debug)]
pub struct Request {
	/// HTTP verb.
	pub method: Method,
	/// Absolute URL without the query parameters held in [`Request::params`].
	pub url: Url,
	/// Query parameters, in insertion order.
	pub params: Vec<(String, String)>,
	/// Request headers.
	pub headers: HeaderMap,
	/// Optional body.
	pub payload: Option<Payload>,
}
impl Request {
	/// Creates a request without parameters, headers, or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, params: Vec::new(), headers: HeaderMap::new(), payload: None }
	}

	/// Attaches a body.
	pub fn with_payload(mut self, payload: Payload) -> Self {
		self.payload = Some(payload);

		self
	}

	/// Sets a query parameter, replacing an existing value for the same key in place.
	pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		let value = value.into();

		match self.params.iter_mut().find(|(existing, _)| *existing == key) {
			Some(slot) => slot.1 = value,
			None => self.params.push((key, value)),
		}
	}

	/// Returns the first value of a query parameter.
	pub fn param(&self, key: &str) -> Option<&str> {
		self.params.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
	}

	/// Returns a header value when it is valid visible ASCII.
	pub fn header_str(&self, name: impl header::AsHeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// URL including the query parameters, as sent on the wire.
	pub fn full_url(&self) -> Url {
		let mut url = self.url.clone();

		if !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(self.params.iter());
		}

		url
	}
}

/// Request body variants; transports match on them exhaustively.
#[derive(Clone, Debug)]
pub enum Payload {
	/// `application/x-www-form-urlencoded` fields.
	Form(Vec<(String, String)>),
	/// JSON document.
	Json(Value),
	/// `multipart/form-data` body.
	Multipart(Multipart),
	/// Raw bytes with an explicit content type.
	Bytes {
		/// `Content-Type` to send.
		content_type: String,
		/// Body bytes.
		body: Vec<u8>,
	},
}
impl Payload {
	/// Builds a form payload from borrowed pairs.
	pub fn form<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}

	/// Form fields, when this is a form payload.
	pub fn form_fields(&self) -> Option<&[(String, String)]> {
		match self {
			Self::Form(fields) => Some(fields),
			_ => None,
		}
	}
}

/// Multipart body: plain text fields plus file parts.
#[derive(Clone, Debug, Default)]
pub struct Multipart {
	/// Text fields.
	pub fields: Vec<(String, String)>,
	/// File parts.
	pub files: Vec<MultipartFile>,
}
impl Multipart {
	/// Adds a text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.fields.push((name.into(), value.into()));

		self
	}

	/// Adds a file part.
	pub fn file(mut self, file: MultipartFile) -> Self {
		self.files.push(file);

		self
	}
}

/// One file inside a [`Multipart`] body.
#[derive(Clone, Debug)]
pub struct MultipartFile {
	/// Form field name.
	pub name: String,
	/// File name reported to the server.
	pub filename: String,
	/// MIME type of the data, when known.
	pub content_type: Option<String>,
	/// File contents.
	pub data: Vec<u8>,
}
