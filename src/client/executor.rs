//! Base request executor: one attempt, no authentication, uniform outcome classification.

// self
use crate::{
	_prelude::*,
	client::RequestDescriptor,
	config::ClientConfig,
	error::{ConfigError, TransportError},
	http::{HttpRequest, HttpResponse, HttpTransport},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Executor specialized for the crate's default reqwest transport.
pub type ReqwestExecutor = RequestExecutor<ReqwestTransport>;

/// Performs single HTTP calls against the configured API and classifies their outcome.
///
/// - `204` → `Ok(None)`.
/// - other 2xx → `Ok(Some(json))` (an empty body also yields `Ok(None)`).
/// - non-2xx → [`Error::Api`] carrying the payload's `message`, or the status text.
/// - no response → [`Error::Transport`], which reports status 503.
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an executor that reuses the caller-provided transport.
	pub fn new(config: impl Into<Arc<ClientConfig>>, transport: impl Into<Arc<T>>) -> Self {
		Self { transport: transport.into(), config: config.into() }
	}

	/// Configuration shared with the client and flows.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Issues one attempt for `request`.
	pub async fn execute(&self, request: &RequestDescriptor) -> Result<Option<Value>> {
		let http = self.prepare(request)?;
		let response = self.transport.send(http).await.map_err(TransportError::network)?;

		classify(response)
	}

	/// `GET path`, decoded into `R`.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		decode(self.execute(&RequestDescriptor::get(path)).await?)
	}

	/// `POST path` with a JSON body, decoded into `R`.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		decode(self.execute(&RequestDescriptor::post(path).with_json(body)?).await?)
	}

	/// `PUT path` with a JSON body, decoded into `R`.
	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		decode(self.execute(&RequestDescriptor::put(path).with_json(body)?).await?)
	}

	/// `DELETE path`, decoded into `R`.
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		decode(self.execute(&RequestDescriptor::delete(path)).await?)
	}

	/// Resolves the URL, merges default headers under the caller's, and serializes the body.
	pub fn prepare(&self, request: &RequestDescriptor) -> Result<HttpRequest> {
		let url = self.config.url_for(&request.path)?;
		let mut headers = BTreeMap::from([
			("accept".to_owned(), "application/json".to_owned()),
			("content-type".to_owned(), "application/json".to_owned()),
		]);

		if let Some(key) = &self.config.api_key {
			headers.insert("x-api-key".into(), key.clone());
		}
		for (name, value) in &request.headers {
			headers.insert(name.to_ascii_lowercase(), value.clone());
		}

		let body = request
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(ConfigError::BodySerialize)?;

		Ok(HttpRequest { method: request.effective_method(), url, headers, body })
	}
}
impl<T> Clone for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { transport: self.transport.clone(), config: self.config.clone() }
	}
}
#[cfg(feature = "reqwest")]
impl RequestExecutor<ReqwestTransport> {
	/// Creates an executor that provisions its own reqwest transport.
	pub fn with_reqwest(config: impl Into<Arc<ClientConfig>>) -> Self {
		Self::new(config, ReqwestTransport::default())
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor").field("config", &self.config).finish()
	}
}

/// Maps a raw response onto the executor's success/failure contract.
pub fn classify(response: HttpResponse) -> Result<Option<Value>> {
	if response.status == 204 {
		return Ok(None);
	}
	if response.is_success() {
		if response.body.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		let de = &mut serde_json::Deserializer::from_slice(&response.body);

		return serde_path_to_error::deserialize(de)
			.map(Some)
			.map_err(|source| Error::Decode { source, status: Some(response.status) });
	}

	let message = serde_json::from_slice::<Value>(&response.body)
		.ok()
		.and_then(|payload| payload.get("message")?.as_str().map(str::to_owned))
		.filter(|message| !message.is_empty())
		.unwrap_or_else(|| {
			if response.status_text.is_empty() {
				format!("HTTP {}", response.status)
			} else {
				response.status_text.clone()
			}
		});

	Err(Error::Api { message, status: response.status, retry_after: response.retry_after })
}

/// Decodes an optional payload into `R`; a missing payload decodes from `null`.
pub fn decode<R>(payload: Option<Value>) -> Result<R>
where
	R: DeserializeOwned,
{
	serde_path_to_error::deserialize(payload.unwrap_or(Value::Null))
		.map_err(|source| Error::Decode { source, status: None })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn no_content_yields_no_payload() {
		assert_eq!(classify(HttpResponse::new(204, Vec::new())).expect("204 should succeed."), None);
		assert_eq!(classify(HttpResponse::new(200, "  ")).expect("Empty 200 should succeed."), None);
	}

	#[test]
	fn success_parses_json_payload() {
		let payload = classify(HttpResponse::json(200, &serde_json::json!({ "routers": [] })))
			.expect("JSON 200 should succeed.");

		assert_eq!(payload, Some(serde_json::json!({ "routers": [] })));
	}

	#[test]
	fn malformed_success_payload_is_a_decode_failure() {
		let err = classify(HttpResponse::new(200, "<html>")).expect_err("HTML should not decode.");

		assert!(matches!(err, Error::Decode { status: Some(200), .. }));
		assert_eq!(err.status(), 503);
	}

	#[test]
	fn failure_prefers_payload_message() {
		let err = classify(
			HttpResponse::json(500, &serde_json::json!({ "message": "db down" }))
				.with_status_text("Internal Server Error"),
		)
		.expect_err("500 should fail.");

		assert_eq!(err.failure().message, "db down");
		assert_eq!(err.status(), 500);
	}

	#[test]
	fn failure_falls_back_to_status_text() {
		let err = classify(HttpResponse::new(404, "not json").with_status_text("Not Found"))
			.expect_err("404 should fail.");

		assert_eq!(err.failure().message, "Not Found");

		let err = classify(HttpResponse::new(418, Vec::new())).expect_err("418 should fail.");

		assert_eq!(err.failure().message, "HTTP 418");
	}

	#[test]
	fn decode_reads_missing_payload_as_null() {
		let optional: Option<u32> = decode(None).expect("Option should decode from null.");

		decode::<()>(None).expect("Unit should decode from a missing payload.");

		assert_eq!(optional, None);
		assert!(decode::<u32>(None).is_err());
	}
}
