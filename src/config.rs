//! Client configuration: API base URL, API key, and endpoint paths.

// crates.io
use url::Host;
// self
use crate::{_prelude::*, error::ConfigError};

/// Paths of the API endpoints the client and its flows talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
	/// Refresh exchange endpoint; 401s from this path never trigger a refresh.
	pub refresh: String,
	/// Authenticated profile of the current user.
	pub current_user: String,
	/// Credential login that may require two-factor authentication.
	pub login: String,
	/// Two-factor method selection.
	pub select_two_factor: String,
	/// Two-factor code submission.
	pub complete_two_factor: String,
	/// Account creation.
	pub signup: String,
	/// Password reset request.
	pub password_reset: String,
	/// Per-company dashboard prefix; the company id is appended as a path segment.
	pub dashboard: String,
}
impl Endpoints {
	fn validate(&self) -> Result<(), ConfigError> {
		for (name, path) in [
			("refresh", &self.refresh),
			("current_user", &self.current_user),
			("login", &self.login),
			("select_two_factor", &self.select_two_factor),
			("complete_two_factor", &self.complete_two_factor),
			("signup", &self.signup),
			("password_reset", &self.password_reset),
			("dashboard", &self.dashboard),
		] {
			if !path.starts_with('/') {
				return Err(ConfigError::InvalidEndpoint { name, path: path.clone() });
			}
		}

		Ok(())
	}
}
impl Default for Endpoints {
	fn default() -> Self {
		Self {
			refresh: "/sessions/refresh".into(),
			current_user: "/sessions/me".into(),
			login: "/sessions/initiate".into(),
			select_two_factor: "/sessions/select-2fa".into(),
			complete_two_factor: "/sessions/complete".into(),
			signup: "/signup".into(),
			password_reset: "/password/reset-initiate".into(),
			dashboard: "/dashboard".into(),
		}
	}
}

/// Immutable configuration shared by the executor, client, and flows.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Optional key sent as `x-api-key` on every request.
	#[serde(default)]
	pub api_key: Option<String>,
	/// Endpoint paths.
	#[serde(default)]
	pub endpoints: Endpoints,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Appends `path` to the base URL.
	///
	/// Paths are concatenated rather than resolved, so a base URL of
	/// `https://api.example.com/v1` keeps its `/v1` prefix. The path must start with `/` and the
	/// joined URL must keep the base URL's scheme, host, and port.
	pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
		if !path.starts_with('/') {
			return Err(ConfigError::ForeignPath { path: path.into() });
		}

		let raw = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
		let url =
			Url::parse(&raw).map_err(|source| ConfigError::InvalidPath { path: path.into(), source })?;

		if url.origin() != self.base_url.origin() {
			return Err(ConfigError::ForeignPath { path: path.into() });
		}

		Ok(url)
	}

	/// Checks whether `path` addresses the refresh endpoint (query strings ignored).
	pub fn is_refresh_path(&self, path: &str) -> bool {
		let bare = path.split(['?', '#']).next().unwrap_or(path);

		bare.trim_end_matches('/') == self.endpoints.refresh.trim_end_matches('/')
	}

	fn validate(&self, allow_insecure_http: bool) -> Result<(), ConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}
		if self.base_url.scheme() != "https" && !allow_insecure_http && !is_loopback(&self.base_url)
		{
			return Err(ConfigError::InsecureBaseUrl { url: self.base_url.to_string() });
		}

		self.endpoints.validate()
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("base_url", &self.base_url.as_str())
			.field("api_key_set", &self.api_key.is_some())
			.field("endpoints", &self.endpoints)
			.finish()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: Url,
	api_key: Option<String>,
	endpoints: Endpoints,
	allow_insecure_http: bool,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self { base_url, api_key: None, endpoints: Endpoints::default(), allow_insecure_http: false }
	}

	/// Sets the API key sent with every request.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());

		self
	}

	/// Overrides the endpoint paths.
	pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Accepts plain-HTTP base URLs on non-loopback hosts.
	pub fn allow_insecure_http(mut self) -> Self {
		self.allow_insecure_http = true;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let config =
			ClientConfig { base_url: self.base_url, api_key: self.api_key, endpoints: self.endpoints };

		config.validate(self.allow_insecure_http)?;

		Ok(config)
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => ip.is_loopback(),
		Some(Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}
