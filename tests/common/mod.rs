//! Scripted transport and client builders shared by the integration tests.

#![allow(dead_code)]

// std
use std::{collections::HashMap, io, sync::Arc, time::Duration};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
use url::Url;
// self
use bearer_broker::{
	auth::TokenPair,
	client::{AuthenticatedClient, RequestExecutor},
	config::ClientConfig,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	store::{KeyValueStore, MemoryStore, TokenStore},
};

pub const REFRESH_PATH: &str = "/sessions/refresh";
pub const ME_PATH: &str = "/sessions/me";

type Handler = dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync;

/// In-process API: answers every request through a handler and records what it saw.
pub struct ScriptedApi {
	handler: Box<Handler>,
	latency: HashMap<String, Duration>,
	requests: Mutex<Vec<HttpRequest>>,
}
impl ScriptedApi {
	pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
		Self { handler: Box::new(handler), latency: HashMap::new(), requests: Mutex::new(Vec::new()) }
	}

	/// Delays responses for `path` so concurrent callers pile up behind it.
	pub fn with_latency(mut self, path: &str, delay: Duration) -> Self {
		self.latency.insert(path.to_owned(), delay);

		self
	}

	pub fn requests(&self) -> Vec<HttpRequest> {
		self.requests.lock().clone()
	}

	pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
		self.requests.lock().iter().filter(|r| r.url.path() == path).cloned().collect()
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.requests_to(path).len()
	}
}
impl HttpTransport for ScriptedApi {
	type TransportError = io::Error;

	fn send(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		Box::pin(async move {
			self.requests.lock().push(request.clone());

			if let Some(delay) = self.latency.get(request.url.path()) {
				tokio::time::sleep(*delay).await;
			}

			Ok((self.handler)(&request))
		})
	}
}

/// Bearer value of `request`, if any.
pub fn bearer(request: &HttpRequest) -> Option<&str> {
	request.header("authorization")
}

pub fn json(status: u16, body: Value) -> HttpResponse {
	HttpResponse::json(status, &body)
}

pub fn unauthorized() -> HttpResponse {
	json(401, serde_json::json!({ "message": "Token expired" })).with_status_text("Unauthorized")
}

/// Protected resource accepting only `Bearer new123`, plus a refresh endpoint issuing it.
pub fn expiring_api() -> ScriptedApi {
	ScriptedApi::new(|request| match request.url.path() {
		REFRESH_PATH => json(200, serde_json::json!({ "accessToken": "new123" })),
		_ if bearer(request) == Some("Bearer new123") =>
			json(200, serde_json::json!({ "id": 42, "email": "ops@example.com" })),
		_ => unauthorized(),
	})
	.with_latency(REFRESH_PATH, Duration::from_millis(50))
}

pub fn config() -> ClientConfig {
	ClientConfig::builder(Url::parse("https://api.example.com").expect("Test URL should parse."))
		.build()
		.expect("Test configuration should be valid.")
}

pub fn client_with_store(
	api: Arc<ScriptedApi>,
	store: MemoryStore,
) -> AuthenticatedClient<ScriptedApi> {
	let backend: Arc<dyn KeyValueStore> = Arc::new(store);

	AuthenticatedClient::new(RequestExecutor::new(config(), api), TokenStore::new(backend))
}

pub fn client(api: Arc<ScriptedApi>) -> (AuthenticatedClient<ScriptedApi>, MemoryStore) {
	let store = MemoryStore::default();

	(client_with_store(api, store.clone()), store)
}

pub async fn seed(client: &AuthenticatedClient<ScriptedApi>, access: &str, refresh: &str) {
	client.tokens().set_tokens(&TokenPair::new(access, refresh)).await;
}
