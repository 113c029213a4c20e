//! Client configuration shared by the decorator, refresh executor, and teardown.
//!
//! The module exposes validated endpoint, cookie, and timeout settings plus a builder so
//! callers can describe their API surface in a transport-agnostic way.

/// Builder API for assembling client configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Paths of the endpoints that are exempt from the refresh flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPaths {
	/// Refresh endpoint (POST, no body, session cookie + CSRF header).
	pub refresh: String,
	/// Login endpoint.
	pub login: String,
}
impl Default for EndpointPaths {
	fn default() -> Self {
		Self { refresh: "/auth/reissue".into(), login: "/auth/login".into() }
	}
}

/// Cookie and header pair used for CSRF echoing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfConfig {
	/// Cookie whose value is echoed.
	pub cookie: String,
	/// Request header that receives the cookie value.
	pub header: String,
}
impl Default for CsrfConfig {
	fn default() -> Self {
		Self { cookie: "XSRF-TOKEN".into(), header: "X-XSRF-TOKEN".into() }
	}
}

/// Immutable client configuration consumed by the request pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL that endpoint paths resolve against; only its origin is kept.
	pub base_url: Url,
	/// Login and refresh endpoint paths.
	pub endpoints: EndpointPaths,
	/// CSRF cookie/header pair.
	pub csrf: CsrfConfig,
	/// JSON pointer locating the access token in refresh and login responses.
	pub token_pointer: String,
	/// Persisted key flagging an active session.
	pub session_marker: String,
	/// Location of the login surface.
	pub login_location: String,
	/// Upper bound for a single refresh call.
	pub refresh_timeout: Duration,
	/// Statuses classified as authentication failures.
	pub auth_failure_statuses: Vec<u16>,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url> {
		self.resolve(&self.endpoints.refresh)
	}

	/// Absolute URL of the login endpoint.
	pub fn login_url(&self) -> Result<Url> {
		self.resolve(&self.endpoints.login)
	}

	/// Resolves `path` against the base URL.
	///
	/// Endpoint paths are absolute, so they replace any path on the base URL; a base such as
	/// `https://api.example.com/v1/` needs its prefix repeated in each endpoint path.
	pub fn resolve(&self, path: &str) -> Result<Url> {
		self.base_url.join(path).map_err(|source| {
			ConfigError::InvalidEndpoint { path: path.to_owned(), source }.into()
		})
	}

	/// Returns `true` when `url` targets the refresh endpoint.
	pub fn is_refresh(&self, url: &Url) -> bool {
		self.targets(url, &self.endpoints.refresh)
	}

	/// Returns `true` when `url` targets the login or refresh endpoint.
	pub fn is_exempt(&self, url: &Url) -> bool {
		self.is_refresh(url) || self.targets(url, &self.endpoints.login)
	}

	/// Returns `true` when `status` counts as an authentication failure.
	pub fn is_auth_failure(&self, status: u16) -> bool {
		self.auth_failure_statuses.contains(&status)
	}

	fn targets(&self, url: &Url, path: &str) -> bool {
		self.resolve(path).is_ok_and(|endpoint| {
			endpoint.path().trim_end_matches('/') == url.path().trim_end_matches('/')
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config(base: &str) -> ClientConfig {
		ClientConfig::builder(Url::parse(base).expect("Fixture base URL should parse."))
			.build()
			.expect("Default configuration should validate.")
	}

	#[test]
	fn exemption_matches_resolved_paths_only() {
		let config = config("https://api.example.com/");
		let url = |value: &str| Url::parse(value).expect("Fixture URL should parse.");

		assert!(config.is_refresh(&url("https://api.example.com/auth/reissue")));
		assert!(config.is_refresh(&url("https://api.example.com/auth/reissue/?x=1")));
		assert!(config.is_exempt(&url("https://api.example.com/auth/login")));
		assert!(!config.is_exempt(&url("https://api.example.com/auth/login/extra")));
		assert!(!config.is_exempt(&url("https://api.example.com/users/auth/login")));
		assert!(!config.is_refresh(&url("https://api.example.com/auth/login")));
	}

	#[test]
	fn absolute_endpoint_paths_replace_base_path() {
		let config = ClientConfig::builder(
			Url::parse("https://api.example.com/v1/").expect("Fixture base URL should parse."),
		)
		.refresh_path("/v1/auth/reissue")
		.build()
		.expect("Prefixed configuration should validate.");

		assert_eq!(
			config.refresh_url().expect("Refresh URL should resolve.").as_str(),
			"https://api.example.com/v1/auth/reissue"
		);
		assert_eq!(
			config.login_url().expect("Login URL should resolve.").as_str(),
			"https://api.example.com/auth/login"
		);
		assert!(config.is_auth_failure(401));
		assert!(config.is_auth_failure(403));
		assert!(!config.is_auth_failure(500));
	}
}
