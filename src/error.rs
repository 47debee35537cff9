//! Client-level error types and the `{ message, status }` failure shape callers observe.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Status synthesized for failures where no response reached the caller.
pub const TRANSPORT_FAILURE_STATUS: u16 = 503;
/// Status synthesized for responses that parsed but did not mean anything usable.
pub const UNEXPECTED_RESPONSE_STATUS: u16 = 502;
/// Status synthesized once the session can no longer be recovered.
pub const SESSION_EXPIRED_STATUS: u16 = 401;
/// Status synthesized for local configuration problems.
pub const CONFIG_FAILURE_STATUS: u16 = 400;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was received (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Server answered with a non-2xx status.
	#[error("{message}")]
	Api {
		/// Server-provided message, or the transport status text.
		message: String,
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// A 2xx payload was not valid JSON or did not match the expected type.
	#[error("Response payload could not be decoded: {source}.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the offending response, when available.
		status: Option<u16>,
	},
	/// Payload decoded but carried an unexpected outcome.
	#[error("{message}")]
	UnexpectedResponse {
		/// Server-provided message, or a description of what was expected.
		message: String,
	},
	/// Refresh failed or was impossible; the caller must authenticate again.
	#[error("Session expired: {reason}.")]
	SessionExpired {
		/// Why the session could not be recovered.
		reason: String,
	},
}
impl Error {
	/// Status code of the `{ message, status }` shape for this error.
	pub fn status(&self) -> u16 {
		match self {
			Self::Config(_) => CONFIG_FAILURE_STATUS,
			Self::Transport(_) | Self::Decode { .. } => TRANSPORT_FAILURE_STATUS,
			Self::Api { status, .. } => *status,
			Self::UnexpectedResponse { .. } => UNEXPECTED_RESPONSE_STATUS,
			Self::SessionExpired { .. } => SESSION_EXPIRED_STATUS,
		}
	}

	/// Human-readable message of the `{ message, status }` shape for this error.
	pub fn message(&self) -> String {
		match self {
			Self::Api { message, .. } | Self::UnexpectedResponse { message } => message.clone(),
			Self::Transport(e) => e.detail(),
			other => other.to_string(),
		}
	}

	/// Projects the error onto the serializable failure shape.
	pub fn failure(&self) -> Failure {
		Failure { message: self.message(), status: self.status() }
	}

	/// Returns `true` when the server rejected the access token.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Api { status: 401, .. })
	}

	/// Returns `true` when the session is gone and the user has to sign in again.
	pub fn is_session_expired(&self) -> bool {
		matches!(self, Self::SessionExpired { .. })
	}
}

/// Uniform `{ message, status }` failure surfaced to UI collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
	/// Human-readable message.
	pub message: String,
	/// HTTP or synthesized status code.
	pub status: u16,
}
impl Display for Failure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} ({})", self.message, self.status)
	}
}
impl From<&Error> for Failure {
	fn from(e: &Error) -> Self {
		e.failure()
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL does not use HTTPS and insecure HTTP was not allowed.
	#[error("Base URL `{url}` must use https.")]
	InsecureBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Base URL cannot carry paths (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot be used as a request base.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Endpoint path is not absolute.
	#[error("Endpoint `{name}` must start with `/`, got `{path}`.")]
	InvalidEndpoint {
		/// Endpoint label.
		name: &'static str,
		/// Offending path.
		path: String,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` does not form a valid URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path is not absolute or would leave the base URL's origin.
	#[error("Request path `{path}` must start with `/` and stay on the configured origin.")]
	ForeignPath {
		/// Offending path.
		path: String,
	},
	/// Path segment is empty or a dot segment.
	#[error("Path segment `{segment}` is empty or a dot segment.")]
	InvalidPathSegment {
		/// Offending segment.
		segment: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Text of the underlying failure, used as the failure message.
	pub fn detail(&self) -> String {
		match self {
			Self::Network { source } => source.to_string(),
			Self::Io(e) => e.to_string(),
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
