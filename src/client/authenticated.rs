//! Bearer-authenticated client with transparent recovery from access-token expiry.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	client::{
		RefreshCoordinator, RequestDescriptor, RequestExecutor, executor,
		refresh::{RefreshTicket, session_expired},
	},
	config::ClientConfig,
	http::HttpTransport,
	obs::{self, FlowKind},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::{http::ReqwestTransport, store::KeyValueStore};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthenticatedClient = AuthenticatedClient<ReqwestTransport>;

const AUTHORIZATION: &str = "authorization";

/// Wraps a [`RequestExecutor`] with bearer authentication and refresh-and-replay.
///
/// Every call reads the stored access token and sends it as `Authorization: Bearer <token>`
/// (no header when no token is stored). A 401 from any path other than the refresh endpoint
/// hands recovery to the [`RefreshCoordinator`]; once it yields a new token the call is
/// replayed exactly once, and whatever that replay returns is final.
///
/// Each client owns its own coordinator. Use [`AuthenticatedClient::with_coordinator`] to make
/// several clients share one, and with it one exchange per expiry episode.
pub struct AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	executor: RequestExecutor<T>,
	tokens: TokenStore,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client with its own idle coordinator.
	pub fn new(executor: RequestExecutor<T>, tokens: TokenStore) -> Self {
		Self { executor, tokens, coordinator: Default::default() }
	}

	/// Replaces the coordinator, typically with one shared by other clients.
	pub fn with_coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
		self.coordinator = coordinator;

		self
	}

	/// Unauthenticated executor underneath the client.
	pub fn executor(&self) -> &RequestExecutor<T> {
		&self.executor
	}

	/// Session credential store.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Refresh coordinator used by this client.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Shared configuration.
	pub fn config(&self) -> &ClientConfig {
		self.executor.config()
	}

	/// Performs an authenticated call, refreshing and replaying once on a 401.
	pub async fn call(&self, request: RequestDescriptor) -> Result<Option<Value>> {
		obs::observe(FlowKind::Authenticated, "call", self.call_with_recovery(request)).await
	}

	/// Authenticated `GET path`, decoded into `R`.
	pub async fn get<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		executor::decode(self.call(RequestDescriptor::get(path)).await?)
	}

	/// Authenticated `POST path` with a JSON body, decoded into `R`.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		executor::decode(self.call(RequestDescriptor::post(path).with_json(body)?).await?)
	}

	/// Authenticated `PUT path` with a JSON body, decoded into `R`.
	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		executor::decode(self.call(RequestDescriptor::put(path).with_json(body)?).await?)
	}

	/// Authenticated `DELETE path`, decoded into `R`.
	pub async fn delete<R>(&self, path: &str) -> Result<R>
	where
		R: DeserializeOwned,
	{
		executor::decode(self.call(RequestDescriptor::delete(path)).await?)
	}

	async fn call_with_recovery(&self, mut request: RequestDescriptor) -> Result<Option<Value>> {
		request.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));

		let generation = self.coordinator.generation();
		let token = self.tokens.access_token().await;

		match self.send(&request, token.as_ref()).await {
			Err(e) if e.is_unauthorized() && !self.config().is_refresh_path(&request.path) => (),
			other => return other,
		}

		let token = self.recover(generation).await?;

		self.send(&request, Some(&token)).await
	}

	async fn recover(&self, generation: u64) -> Result<AccessToken> {
		match self.coordinator.enter(generation) {
			RefreshTicket::Lead(lease) => self.lead_refresh(lease).await,
			RefreshTicket::Wait(rx) => match rx.await {
				Ok(Ok(token)) => Ok(token),
				Ok(Err(failure)) => Err(session_expired(&failure)),
				Err(_) => Err(Error::SessionExpired {
					reason: "Refresh exchange was abandoned before it settled".into(),
				}),
			},
			RefreshTicket::Replay => self.tokens.access_token().await.ok_or_else(|| {
				Error::SessionExpired {
					reason: "Access token was cleared while the request was in flight".into(),
				}
			}),
		}
	}

	async fn send(
		&self,
		request: &RequestDescriptor,
		token: Option<&AccessToken>,
	) -> Result<Option<Value>> {
		match token {
			Some(token) => {
				let mut authorized = request.clone();

				authorized.headers.insert(AUTHORIZATION.into(), token.bearer());

				self.executor.execute(&authorized).await
			},
			None => self.executor.execute(request).await,
		}
	}
}
impl<T> Clone for AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			executor: self.executor.clone(),
			tokens: self.tokens.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a client that provisions its own reqwest transport.
	pub fn with_reqwest(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
		Self::new(RequestExecutor::with_reqwest(config), TokenStore::new(store))
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("executor", &self.executor)
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
