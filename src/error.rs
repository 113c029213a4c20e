//! Client-level error types shared across the request pipeline, refresh flow, and surfaces.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on an ordinary request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Persistence surface failure.
	#[error("{0}")]
	Session(
		#[from]
		#[source]
		crate::session::SessionError,
	),
	/// The refresh call did not produce a usable token; the session has been torn down.
	#[error(transparent)]
	RefreshFailed(#[from] RefreshError),

	/// Server answered with a non-success status that is not an authentication failure.
	#[error("Server responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Response body, lossily decoded.
		body: String,
	},
	/// Authentication failure that the client will not recover from.
	#[error("Authentication failed with HTTP {status} and will not be retried: {reason}.")]
	TerminalAuth {
		/// HTTP status code.
		status: u16,
		/// Why no refresh was attempted.
		reason: TerminalReason,
	},
}
impl Error {
	/// Returns the HTTP status attached to the error, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::TerminalAuth { status, .. } => Some(*status),
			Self::RefreshFailed(RefreshError::Rejected { status }) => Some(*status),
			_ => None,
		}
	}
}

/// Reasons an authentication failure is surfaced instead of recovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminalReason {
	/// The request targeted the login or refresh endpoint.
	Exempt,
	/// The request was already replayed once after a refresh.
	AlreadyRetried,
	/// The request never carried a bearer token.
	Anonymous,
	/// The session was torn down while the request was in flight.
	SessionEnded,
}
impl TerminalReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Exempt => "exempt endpoint",
			Self::AlreadyRetried => "already retried",
			Self::Anonymous => "anonymous request",
			Self::SessionEnded => "session ended",
		}
	}
}
impl Display for TerminalReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failure of a single refresh cycle, shared verbatim with every request waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint rejected the exchange.
	#[error("Refresh endpoint rejected the exchange with HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
	},
	/// Refresh endpoint answered successfully but carried no usable token.
	#[error("Refresh response did not contain an access token.")]
	MissingToken,
	/// Refresh endpoint answered with a body that is not JSON.
	#[error("Refresh response is malformed: {message}.")]
	MalformedResponse {
		/// Parser message.
		message: String,
	},
	/// Network failure while calling the refresh endpoint.
	#[error("Network error occurred while calling the refresh endpoint.")]
	Transport {
		/// Underlying transport failure.
		#[source]
		source: Arc<TransportError>,
	},
	/// Refresh call did not settle in time.
	#[error("Refresh call did not settle within {after}.")]
	TimedOut {
		/// Configured timeout.
		after: Duration,
	},
	/// The request driving the refresh was dropped before it settled.
	#[error("Refresh was abandoned before it settled.")]
	Abandoned,
}
impl From<TransportError> for RefreshError {
	fn from(e: TransportError) -> Self {
		Self::Transport { source: Arc::new(e) }
	}
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration failed validation.
	#[error(transparent)]
	Invalid(#[from] crate::config::ConfigBuildError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint path could not be joined onto the base URL.
	#[error("Endpoint `{path}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request could not be converted for the transport.
	#[error("Request could not be prepared for the transport.")]
	InvalidRequest {
		/// Underlying conversion failure.
		#[source]
		source: BoxError,
	},
	/// Login response did not carry a token at the configured pointer.
	#[error("Login response did not contain an access token.")]
	MissingLoginToken,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a request conversion failure inside [`ConfigError`].
	pub fn invalid_request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidRequest { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures reported by an [`HttpTransport`](crate::http::HttpTransport).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
