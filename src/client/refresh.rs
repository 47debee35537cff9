//! Refresh coordination: one exchange per expiry episode, shared by every caller that hit a 401.
//!
//! The coordinator is a two-state machine (`idle`, `refreshing`) guarded by one mutex. The
//! first caller to enter while idle becomes the leader and receives a [`RefreshLease`]; callers
//! entering while an exchange is in flight append a deferred handle to a FIFO queue and suspend
//! until the leader settles the episode. Settling resets the flag and drains the queue under the
//! same lock, then resolves every handle with the same outcome. The lease settles itself on
//! drop, so a cancelled or panicking leader can never leave the coordinator stuck.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::{collections::VecDeque, mem};
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshToken},
	client::{AuthenticatedClient, RequestDescriptor, executor},
	error::{Failure, SESSION_EXPIRED_STATUS},
	http::HttpTransport,
	obs::{self, FlowKind},
};

/// Outcome every caller of one episode observes.
pub type RefreshOutcome = Result<AccessToken, Failure>;

/// Coordinates refresh exchanges for the clients wired to it.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` while an exchange is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Number of callers currently queued behind the in-flight exchange.
	pub fn pending(&self) -> usize {
		self.state.lock().pending.len()
	}

	/// Number of successful exchanges so far.
	///
	/// Callers capture it before sending a request; a 401 observed with an older generation was
	/// caused by a token that has already been replaced.
	pub fn generation(&self) -> u64 {
		self.state.lock().generation
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Decides how a caller whose request failed with 401 recovers.
	pub(crate) fn enter(&self, observed_generation: u64) -> RefreshTicket<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.pending.push_back(tx);

			let waiting = state.pending.len();

			drop(state);
			self.metrics.record_coalesced();
			obs::refresh_coalesced(waiting);

			return RefreshTicket::Wait(rx);
		}
		if state.generation != observed_generation {
			return RefreshTicket::Replay;
		}

		state.refreshing = true;

		drop(state);
		self.metrics.record_attempt();

		RefreshTicket::Lead(RefreshLease { coordinator: self, settled: false, exchanged: None })
	}

	fn settle(&self, outcome: RefreshOutcome) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			if outcome.is_ok() {
				state.generation += 1;
			}

			mem::take(&mut state.pending)
		};
		let released = waiters.len();

		match &outcome {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		obs::refresh_settled(outcome.as_ref().map(|_| ()), released);

		for waiter in waiters {
			// A waiter that stopped listening has nothing left to settle.
			let _ = waiter.send(outcome.clone());
		}

		released
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	refreshing: bool,
	generation: u64,
	pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// How a caller recovers from a 401.
#[derive(Debug)]
pub(crate) enum RefreshTicket<'a> {
	/// Run the exchange and settle the episode.
	Lead(RefreshLease<'a>),
	/// Wait for the in-flight exchange.
	Wait(oneshot::Receiver<RefreshOutcome>),
	/// The token that failed was already replaced; retry with the stored one.
	Replay,
}

/// Leadership of one refresh episode.
///
/// Dropping an unsettled lease settles the episode: with the exchanged token when the server
/// already issued one, as failed otherwise.
#[derive(Debug)]
pub(crate) struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
	exchanged: Option<AccessToken>,
}
impl RefreshLease<'_> {
	/// Records the token issued by the exchange before its side effects run.
	pub(crate) fn exchanged(&mut self, token: &AccessToken) {
		self.exchanged = Some(token.clone());
	}

	/// Resets the flag, then resolves every queued caller with `outcome` in arrival order.
	pub(crate) fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		self.coordinator.settle(outcome)
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		let outcome = match self.exchanged.take() {
			Some(token) => Ok(token),
			None => Err(Failure {
				message: "Refresh exchange was abandoned before it settled.".into(),
				status: SESSION_EXPIRED_STATUS,
			}),
		};

		self.coordinator.settle(outcome);
	}
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	#[serde(rename = "refreshToken")]
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	#[serde(rename = "accessToken")]
	access_token: AccessToken,
}

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Runs the exchange as episode leader, applies its side effects, and settles the episode.
	///
	/// On success the new access token is persisted before any waiter is released. On failure
	/// both tokens are cleared before any waiter is released, and the caller receives
	/// [`Error::SessionExpired`].
	///
	/// If the leader is cancelled while the new token is being persisted, waiters are still
	/// released with that token; the store may then keep the previous one until the next
	/// episode.
	pub(crate) async fn lead_refresh(&self, mut lease: RefreshLease<'_>) -> Result<AccessToken> {
		let exchanged = obs::observe(FlowKind::Refresh, "refresh_exchange", self.exchange()).await;

		match exchanged {
			Ok(token) => {
				lease.exchanged(&token);
				self.tokens().save_access_token(&token).await;
				lease.settle(Ok(token.clone()));

				Ok(token)
			},
			Err(e) => {
				let failure = refresh_failure(&e);

				self.tokens().clear_tokens().await;
				lease.settle(Err(failure.clone()));

				Err(session_expired(&failure))
			},
		}
	}

	/// Trades the stored refresh token for a new access token.
	///
	/// The request goes through the base executor, so it never carries an access token. The
	/// refresh token itself is not rotated.
	async fn exchange(&self) -> Result<AccessToken> {
		let refresh: RefreshToken = self
			.tokens()
			.refresh_token()
			.await
			.ok_or_else(|| Error::SessionExpired { reason: "No refresh token is stored".into() })?;
		let request = RequestDescriptor::post(self.config().endpoints.refresh.as_str())
			.with_json(&RefreshRequest { refresh_token: refresh.expose() })?;
		let payload = self.executor().execute(&request).await?;
		let response: RefreshResponse =
			executor::decode(payload).map_err(|_| Error::UnexpectedResponse {
				message: "Refresh response did not carry an access token.".into(),
			})?;

		if response.access_token.expose().is_empty() {
			return Err(Error::UnexpectedResponse {
				message: "Refresh response carried an empty access token.".into(),
			});
		}

		Ok(response.access_token)
	}
}

/// Reason forwarded to every caller of a failed episode.
fn refresh_failure(e: &Error) -> Failure {
	match e {
		Error::SessionExpired { reason } =>
			Failure { message: reason.clone(), status: SESSION_EXPIRED_STATUS },
		other => other.failure(),
	}
}

/// Error a caller receives once its episode failed.
pub(crate) fn session_expired(failure: &Failure) -> Error {
	Error::SessionExpired { reason: failure.message.clone() }
}
