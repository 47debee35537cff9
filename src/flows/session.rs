//! Credential login with optional two-factor authentication, and session housekeeping.

// std
use std::mem;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RefreshToken, TokenPair, UserProfile},
	client::AuthenticatedClient,
	http::HttpTransport,
	obs::{self, FlowKind},
};

const STATUS_TWO_FACTOR_REQUIRED: &str = "2fa_selection_required";
const STATUS_CODE_SENT: &str = "code_sent";
const STATUS_COMPLETED: &str = "completed";

/// Email + password submitted to the login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
	/// Account email.
	pub email: String,
	/// Account password.
	pub password: String,
}
impl LoginCredentials {
	/// Bundles the credentials.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Result of a login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginOutcome {
	/// Credentials accepted; a second factor must be selected and submitted.
	TwoFactorRequired {
		/// Short-lived token binding the two-factor steps to this login.
		pre_auth_token: String,
		/// Second-factor methods offered by the server.
		methods: Vec<String>,
	},
	/// Session established; tokens are persisted.
	Completed {
		/// Authenticated user.
		user: UserProfile,
		/// Access token issued for the session.
		access_token: AccessToken,
	},
}

/// Account creation payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequest {
	/// Display name.
	pub name: String,
	/// Account email.
	pub email: String,
	/// Account password.
	pub password: String,
}
impl Debug for SignupRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignupRequest")
			.field("name", &self.name)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	pre_auth_token: Option<String>,
	#[serde(default)]
	methods: Vec<String>,
	#[serde(default)]
	access_token: Option<AccessToken>,
	#[serde(default)]
	refresh_token: Option<RefreshToken>,
	#[serde(default)]
	message: Option<String>,
}
impl SessionResponse {
	fn has_status(&self, expected: &str) -> bool {
		self.status.as_deref() == Some(expected)
	}

	fn token_pair(&mut self) -> Option<TokenPair> {
		let access_token = self.access_token.take().filter(|t| !t.expose().is_empty())?;
		let refresh_token = self.refresh_token.take().filter(|t| !t.expose().is_empty())?;

		Some(TokenPair { access_token, refresh_token })
	}

	fn unexpected(self, fallback: &str) -> Error {
		Error::UnexpectedResponse { message: self.message.unwrap_or_else(|| fallback.to_owned()) }
	}
}

#[derive(Debug, Default, Deserialize)]
struct MessageResponse {
	#[serde(default)]
	message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TwoFactorSelection<'a> {
	pre_auth_token: &'a str,
	method: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TwoFactorCompletion<'a> {
	pre_auth_token: &'a str,
	method: &'a str,
	two_factor_code: &'a str,
}

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Submits credentials; persists tokens and loads the user when no second factor is needed.
	pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome> {
		obs::observe(FlowKind::Session, "login", async move {
			#[derive(Serialize)]
			struct Body<'a> {
				email: &'a str,
				password: &'a str,
			}

			let mut response: SessionResponse = self
				.executor()
				.post(
					&self.config().endpoints.login,
					&Body { email: &credentials.email, password: &credentials.password },
				)
				.await?;

			if response.has_status(STATUS_TWO_FACTOR_REQUIRED) {
				let pre_auth_token = response.pre_auth_token.take().ok_or_else(|| {
					Error::UnexpectedResponse {
						message: "Two-factor challenge did not carry a pre-auth token.".into(),
					}
				})?;

				return Ok(LoginOutcome::TwoFactorRequired {
					pre_auth_token,
					methods: mem::take(&mut response.methods),
				});
			}

			self.establish(response, "Unexpected login response.").await
		})
		.await
	}

	/// Asks the server to send a second-factor code through `method`.
	pub async fn select_two_factor_method(&self, pre_auth_token: &str, method: &str) -> Result<()> {
		obs::observe(FlowKind::Session, "select_two_factor_method", async move {
			let response: SessionResponse = self
				.executor()
				.post(
					&self.config().endpoints.select_two_factor,
					&TwoFactorSelection { pre_auth_token, method },
				)
				.await?;

			if response.has_status(STATUS_CODE_SENT) {
				Ok(())
			} else {
				Err(response.unexpected("Unexpected response for two-factor method selection."))
			}
		})
		.await
	}

	/// Submits the second-factor code; persists tokens and loads the user.
	pub async fn complete_two_factor(
		&self,
		pre_auth_token: &str,
		method: &str,
		code: &str,
	) -> Result<LoginOutcome> {
		obs::observe(FlowKind::Session, "complete_two_factor", async move {
			let response: SessionResponse = self
				.executor()
				.post(
					&self.config().endpoints.complete_two_factor,
					&TwoFactorCompletion { pre_auth_token, method, two_factor_code: code },
				)
				.await?;

			self.establish(response, "Unexpected response for two-factor completion.").await
		})
		.await
	}

	/// Profile of the signed-in user.
	pub async fn current_user(&self) -> Result<UserProfile> {
		self.get(&self.config().endpoints.current_user).await
	}

	/// Creates an account; returns the server's confirmation message, if any.
	pub async fn signup(&self, request: &SignupRequest) -> Result<Option<String>> {
		obs::observe(FlowKind::Session, "signup", async move {
			let response: Option<MessageResponse> =
				self.executor().post(&self.config().endpoints.signup, request).await?;

			Ok(response.and_then(|r| r.message))
		})
		.await
	}

	/// Requests a password-reset email; returns the server's message, if any.
	pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>> {
		obs::observe(FlowKind::Session, "request_password_reset", async move {
			#[derive(Serialize)]
			struct Body<'a> {
				email: &'a str,
			}

			let response: Option<MessageResponse> = self
				.executor()
				.post(&self.config().endpoints.password_reset, &Body { email })
				.await?;

			Ok(response.and_then(|r| r.message))
		})
		.await
	}

	/// Forgets both session credentials.
	pub async fn logout(&self) {
		self.tokens().clear_tokens().await;
	}

	/// Returns `true` when both session credentials are stored.
	pub async fn has_session(&self) -> bool {
		self.tokens().has_tokens().await
	}

	async fn establish(&self, mut response: SessionResponse, fallback: &str) -> Result<LoginOutcome> {
		if !response.has_status(STATUS_COMPLETED) {
			return Err(response.unexpected(fallback));
		}

		let Some(tokens) = response.token_pair() else {
			return Err(response.unexpected(fallback));
		};

		self.tokens().set_tokens(&tokens).await;

		let user = self.current_user().await?;

		Ok(LoginOutcome::Completed { user, access_token: tokens.access_token })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credentials_debug_hides_password() {
		let credentials = LoginCredentials::new("ops@example.com", "hunter2");

		assert!(!format!("{credentials:?}").contains("hunter2"));
	}

	#[test]
	fn session_response_requires_both_tokens() {
		let mut partial: SessionResponse =
			serde_json::from_str(r#"{"status":"completed","accessToken":"a1"}"#)
				.expect("Partial response should deserialize.");
		let mut complete: SessionResponse = serde_json::from_str(
			r#"{"status":"completed","accessToken":"a1","refreshToken":"r1"}"#,
		)
		.expect("Complete response should deserialize.");

		assert!(partial.token_pair().is_none());
		assert_eq!(complete.token_pair(), Some(TokenPair::new("a1", "r1")));
	}

	#[test]
	fn unexpected_prefers_server_message() {
		let response = SessionResponse { message: Some("Conta bloqueada".into()), ..Default::default() };

		assert_eq!(response.unexpected("fallback").to_string(), "Conta bloqueada");
		assert_eq!(SessionResponse::default().unexpected("fallback").to_string(), "fallback");
	}
}
