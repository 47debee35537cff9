//! Access/refresh token persistence on top of an injected [`KeyValueStore`].

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshToken, TokenPair},
	obs,
	store::{KeyValueStore, MemoryStore},
};

/// Key the access token is stored under.
pub const ACCESS_TOKEN_KEY: &str = "bearer_broker.access_token";
/// Key the refresh token is stored under.
pub const REFRESH_TOKEN_KEY: &str = "bearer_broker.refresh_token";

/// Session credential store.
///
/// Backend failures never cross this boundary: reads degrade to `None`, writes are dropped,
/// and both emit a diagnostic through [`obs`].
#[derive(Clone)]
pub struct TokenStore {
	backend: Arc<dyn KeyValueStore>,
}
impl TokenStore {
	/// Wraps a key-value backend.
	pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
		Self { backend }
	}

	/// Store backed by a fresh [`MemoryStore`].
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryStore::default()))
	}

	/// Current access token, if any.
	pub async fn access_token(&self) -> Option<AccessToken> {
		self.read(ACCESS_TOKEN_KEY, "get_access_token").await.map(AccessToken::new)
	}

	/// Current refresh token, if any.
	pub async fn refresh_token(&self) -> Option<RefreshToken> {
		self.read(REFRESH_TOKEN_KEY, "get_refresh_token").await.map(RefreshToken::new)
	}

	/// Replaces the access token, leaving the refresh token untouched.
	pub async fn save_access_token(&self, token: &AccessToken) {
		self.write(ACCESS_TOKEN_KEY, token.expose(), "save_access_token").await;
	}

	/// Persists both credentials of a fresh session.
	pub async fn set_tokens(&self, tokens: &TokenPair) {
		self.write(ACCESS_TOKEN_KEY, tokens.access_token.expose(), "save_access_token").await;
		self.write(REFRESH_TOKEN_KEY, tokens.refresh_token.expose(), "save_refresh_token").await;
	}

	/// Removes both credentials in one backend call.
	pub async fn clear_tokens(&self) {
		if let Err(e) = self.backend.delete_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]).await {
			obs::store_degraded("clear_tokens", &e);
		}
	}

	/// Returns `true` only when both credentials are present.
	pub async fn has_tokens(&self) -> bool {
		self.access_token().await.is_some() && self.refresh_token().await.is_some()
	}

	async fn read(&self, key: &str, operation: &'static str) -> Option<String> {
		match self.backend.get(key).await {
			Ok(value) => value.filter(|v| !v.is_empty()),
			Err(e) => {
				obs::store_degraded(operation, &e);

				None
			},
		}
	}

	async fn write(&self, key: &str, value: &str, operation: &'static str) {
		if let Err(e) = self.backend.set(key, value.to_owned()).await {
			obs::store_degraded(operation, &e);
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenStore(..)")
	}
}
