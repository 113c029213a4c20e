// crates.io
use ::http::HeaderName;
// self
use crate::{
	_prelude::*,
	config::{ClientConfig, CsrfConfig, EndpointPaths},
};

/// Errors raised while constructing or validating configurations.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ConfigBuildError {
	/// Base URL must use HTTP(S).
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be absolute.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativePath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Token pointer must follow RFC 6901.
	#[error("Token pointer must be empty or start with `/`: {pointer}.")]
	InvalidTokenPointer {
		/// Pointer that failed validation.
		pointer: String,
	},
	/// CSRF header name is not a valid HTTP header name.
	#[error("CSRF header name is invalid: {header}.")]
	InvalidCsrfHeader {
		/// Header name that failed validation.
		header: String,
	},
	/// Named value must not be blank.
	#[error("The {field} must not be empty.")]
	Empty {
		/// Which field was blank.
		field: &'static str,
	},
	/// Refresh timeout must be strictly positive.
	#[error("The refresh timeout must be positive.")]
	NonPositiveTimeout,
	/// At least one authentication failure status is required.
	#[error("At least one authentication failure status is required.")]
	NoAuthFailureStatuses,
	/// Authentication failure statuses must be client errors.
	#[error("Status {status} cannot signal an authentication failure.")]
	InvalidAuthFailureStatus {
		/// Offending status.
		status: u16,
	},
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL that endpoint paths resolve against.
	pub base_url: Url,
	/// Login and refresh endpoint paths.
	pub endpoints: EndpointPaths,
	/// CSRF cookie/header pair.
	pub csrf: CsrfConfig,
	/// JSON pointer locating the access token.
	pub token_pointer: String,
	/// Persisted session marker key.
	pub session_marker: String,
	/// Login surface location.
	pub login_location: String,
	/// Upper bound for a single refresh call.
	pub refresh_timeout: Duration,
	/// Statuses classified as authentication failures.
	pub auth_failure_statuses: Vec<u16>,
}
impl ClientConfigBuilder {
	const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(10);

	/// Creates a new builder seeded with defaults and the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: EndpointPaths::default(),
			csrf: CsrfConfig::default(),
			token_pointer: "/data/accessToken".into(),
			session_marker: "has_session".into(),
			login_location: "/login".into(),
			refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
			auth_failure_statuses: vec![401, 403],
		}
	}

	/// Sets the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Sets the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Sets the CSRF cookie and header names.
	pub fn csrf(mut self, cookie: impl Into<String>, header: impl Into<String>) -> Self {
		self.csrf = CsrfConfig { cookie: cookie.into(), header: header.into() };

		self
	}

	/// Sets the JSON pointer locating the access token.
	pub fn token_pointer(mut self, pointer: impl Into<String>) -> Self {
		self.token_pointer = pointer.into();

		self
	}

	/// Sets the persisted session marker key.
	pub fn session_marker(mut self, key: impl Into<String>) -> Self {
		self.session_marker = key.into();

		self
	}

	/// Sets the login surface location.
	pub fn login_location(mut self, location: impl Into<String>) -> Self {
		self.login_location = location.into();

		self
	}

	/// Overrides the refresh timeout (defaults to 10 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.refresh_timeout = timeout;

		self
	}

	/// Replaces the statuses classified as authentication failures.
	pub fn auth_failure_statuses<I>(mut self, statuses: I) -> Self
	where
		I: IntoIterator<Item = u16>,
	{
		self.auth_failure_statuses = statuses.into_iter().collect();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigBuildError> {
		let mut auth_failure_statuses = self.auth_failure_statuses;

		auth_failure_statuses.sort_unstable();
		auth_failure_statuses.dedup();

		let config = ClientConfig {
			base_url: self.base_url,
			endpoints: self.endpoints,
			csrf: self.csrf,
			token_pointer: self.token_pointer,
			session_marker: self.session_marker,
			login_location: self.login_location,
			refresh_timeout: self.refresh_timeout,
			auth_failure_statuses,
		};

		config.validate()?;

		Ok(config)
	}
}

impl ClientConfig {
	/// Validates invariants for the configuration.
	///
	/// Deserialized configurations should be checked with this before use.
	pub fn validate(&self) -> Result<(), ConfigBuildError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigBuildError::UnsupportedScheme { url: self.base_url.to_string() });
		}

		validate_path("refresh", &self.endpoints.refresh)?;
		validate_path("login", &self.endpoints.login)?;

		if !self.token_pointer.is_empty() && !self.token_pointer.starts_with('/') {
			return Err(ConfigBuildError::InvalidTokenPointer {
				pointer: self.token_pointer.clone(),
			});
		}

		validate_not_empty("CSRF cookie name", &self.csrf.cookie)?;

		if HeaderName::from_bytes(self.csrf.header.as_bytes()).is_err() {
			return Err(ConfigBuildError::InvalidCsrfHeader { header: self.csrf.header.clone() });
		}

		validate_not_empty("session marker", &self.session_marker)?;
		validate_not_empty("login location", &self.login_location)?;

		if !self.refresh_timeout.is_positive() {
			return Err(ConfigBuildError::NonPositiveTimeout);
		}
		if self.auth_failure_statuses.is_empty() {
			return Err(ConfigBuildError::NoAuthFailureStatuses);
		}
		if let Some(&status) =
			self.auth_failure_statuses.iter().find(|status| !(400..=499).contains(*status))
		{
			return Err(ConfigBuildError::InvalidAuthFailureStatus { status });
		}

		Ok(())
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), ConfigBuildError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigBuildError::RelativePath { endpoint, path: path.to_owned() })
	}
}

fn validate_not_empty(field: &'static str, value: &str) -> Result<(), ConfigBuildError> {
	if value.trim().is_empty() { Err(ConfigBuildError::Empty { field }) } else { Ok(()) }
}
