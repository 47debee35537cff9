//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`] alongside the wire-level [`HttpRequest`] and
//! [`HttpResponse`] so downstream crates can plug in a custom HTTP stack (or a scripted
//! fake in tests) without touching the executor's classification rules. Transports report
//! exactly what happened on the wire: any response, whatever its status, is `Ok`, and
//! only "no response received" is an error.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back several clients,
/// and the futures they return must be `Send` so callers can hop executors.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted when no response was received.
	type TransportError: 'static + Send + Sync + StdError;

	/// Performs a single attempt; no retries, no redirects beyond the stack's defaults.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;
}

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the wire token for the method.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => Self::GET,
			Method::Post => Self::POST,
			Method::Put => Self::PUT,
			Method::Patch => Self::PATCH,
			Method::Delete => Self::DELETE,
		}
	}
}

/// Fully resolved request handed to a transport.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Header map keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Serialized body, if any.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Looks up a header by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				let shown = if name == "authorization" || name == "x-api-key" {
					"<redacted>"
				} else {
					value.as_str()
				};

				(name.as_str(), shown)
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Raw response as received from the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Reason phrase for the status (may be empty).
	pub status_text: String,
	/// Raw body bytes.
	pub body: Vec<u8>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}
impl HttpResponse {
	/// Builds a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into(), ..Default::default() }
	}

	/// Builds a response carrying a JSON body.
	pub fn json(status: u16, body: &serde_json::Value) -> Self {
		Self::new(status, body.to_string())
	}

	/// Overrides the reason phrase.
	pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
		self.status_text = text.into();

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method.into(), request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse {
				status: status.as_u16(),
				status_text: status.canonical_reason().unwrap_or_default().to_owned(),
				body,
				retry_after,
			})
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn debug_output_redacts_credentials() {
		let request = HttpRequest {
			method: Method::Get,
			url: Url::parse("https://api.example.com/sessions/me").expect("URL should parse."),
			headers: BTreeMap::from([
				("authorization".to_owned(), "Bearer secret-token".to_owned()),
				("x-api-key".to_owned(), "secret-key".to_owned()),
				("accept".to_owned(), "application/json".to_owned()),
			]),
			body: None,
		};
		let rendered = format!("{request:?}");

		assert!(!rendered.contains("secret-token"));
		assert!(!rendered.contains("secret-key"));
		assert!(rendered.contains("application/json"));
		assert_eq!(request.header("Authorization"), Some("Bearer secret-token"));
	}

	#[test]
	fn success_range_is_2xx_only() {
		assert!(HttpResponse::new(204, Vec::new()).is_success());
		assert!(HttpResponse::new(299, Vec::new()).is_success());
		assert!(!HttpResponse::new(301, Vec::new()).is_success());
		assert!(!HttpResponse::new(401, Vec::new()).is_success());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn retry_after_accepts_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, "30".parse().expect("Header value should parse."));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
	}
}
