//! Request pipeline: the base executor, the bearer-authenticated client, and the refresh
//! coordinator that lets concurrent 401s share one refresh exchange.
//!
//! [`RequestExecutor`] performs exactly one attempt and classifies the outcome.
//! [`AuthenticatedClient`] wraps it, attaches the stored access token, and on a 401 asks the
//! [`RefreshCoordinator`] for a new one before replaying the call once. The coordinator
//! keeps at most one exchange in flight; callers that hit a 401 meanwhile queue behind it and
//! all observe the same outcome.

pub mod authenticated;
pub mod executor;
pub mod refresh;

pub use authenticated::*;
pub use executor::*;
pub use refresh::*;

// self
use crate::{_prelude::*, error::ConfigError, http::Method};

/// Caller-side description of one logical API call.
///
/// Header names are stored lowercase so later insertions override earlier ones regardless of
/// the casing callers used.
#[derive(Clone, PartialEq)]
pub struct RequestDescriptor {
	/// Explicit method; when unset the call is `POST` if a body is present, `GET` otherwise.
	pub method: Option<Method>,
	/// Path appended to the configured base URL, starting with `/`.
	pub path: String,
	/// Caller headers; these override the executor defaults.
	pub headers: BTreeMap<String, String>,
	/// JSON body.
	pub body: Option<Value>,
}
impl RequestDescriptor {
	/// Creates a descriptor whose method is inferred from the body.
	pub fn new(path: impl Into<String>) -> Self {
		Self { method: None, path: path.into(), headers: BTreeMap::new(), body: None }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(path).with_method(Method::Get)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(path).with_method(Method::Post)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(path).with_method(Method::Put)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(path).with_method(Method::Delete)
	}

	/// Sets the method explicitly.
	pub fn with_method(mut self, method: Method) -> Self {
		self.method = Some(method);

		self
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Sets a raw JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Serializes `body` into the JSON body.
	pub fn with_json<B>(self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		let value = serde_json::to_value(body).map_err(ConfigError::BodySerialize)?;

		Ok(self.with_body(value))
	}

	/// Method the call goes out with.
	pub fn effective_method(&self) -> Method {
		match (self.method, &self.body) {
			(Some(method), _) => method,
			(None, Some(_)) => Method::Post,
			(None, None) => Method::Get,
		}
	}
}
impl Debug for RequestDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDescriptor")
			.field("method", &self.effective_method())
			.field("path", &self.path)
			.field("headers", &self.headers.keys().collect::<Vec<_>>())
			.field("has_body", &self.body.is_some())
			.finish()
	}
}
