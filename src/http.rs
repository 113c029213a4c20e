//! Request descriptors and the transport seam the client pipeline drives.
//!
//! [`ApiRequest`] is the descriptor that flows through the pipeline: method, URL, headers, body,
//! and an explicit attempt count that only [`ApiRequest::retried_with`] advances. Transports
//! implement [`HttpTransport`] and report every HTTP status as an [`ApiResponse`]; only
//! network-level failures surface as errors so the coordinator can classify statuses itself.

pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};

// crates.io
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, auth::AccessToken, error::ConfigError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<ApiResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing API calls for the client.
///
/// The trait is the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can be shared by every clone of an
/// [`AuthClient`](crate::client::AuthClient), and the futures they return must be `Send` so
/// callers can spawn pipeline futures onto multi-threaded executors. Cookies that carry the
/// long-lived session credential are the transport's concern; the pipeline never reads them.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type Error: 'static + Send + Sync + StdError;

	/// Executes `request`, resolving to the response for any HTTP status.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_, Self::Error>;
}

/// Outgoing request descriptor.
///
/// Only the `Authorization` header changes between attempts; the attempt count is advanced by
/// producing a new descriptor instead of flagging the old one.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	url: Url,
	headers: HeaderMap,
	body: Vec<u8>,
	attempt: u8,
}
impl ApiRequest {
	/// Creates a first-attempt request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: Vec::new(), attempt: 0 }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Sets a header, replacing any previous value.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Serializes `payload` as the JSON body and sets the content type.
	pub fn with_json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(payload).map_err(ConfigError::invalid_request)?;
		self.headers
			.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Request method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Target URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Request headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Mutable request headers.
	pub fn headers_mut(&mut self) -> &mut HeaderMap {
		&mut self.headers
	}

	/// Request body.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Number of replays this descriptor has gone through.
	pub fn attempt(&self) -> u8 {
		self.attempt
	}

	/// Returns `true` once the request has been replayed after a refresh.
	pub fn is_retry(&self) -> bool {
		self.attempt > 0
	}

	/// Bearer credential currently attached, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers
			.get(header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(crate::auth::bearer_credential)
	}

	/// Returns `true` when an `Authorization` header is attached.
	pub fn is_authorized(&self) -> bool {
		self.headers.contains_key(header::AUTHORIZATION)
	}

	/// Attaches `token` as a bearer `Authorization` header.
	///
	/// Returns `false` (leaving the request anonymous) if the token cannot be encoded as a header.
	pub fn authorize(&mut self, token: &AccessToken) -> bool {
		match HeaderValue::from_str(&token.bearer()) {
			Ok(mut value) => {
				value.set_sensitive(true);
				self.headers.insert(header::AUTHORIZATION, value);

				true
			},
			Err(_) => {
				self.headers.remove(header::AUTHORIZATION);

				false
			},
		}
	}

	/// Removes the `Authorization` header.
	pub fn deauthorize(&mut self) {
		self.headers.remove(header::AUTHORIZATION);
	}

	/// Produces the replay of this request carrying `token`, with the attempt count advanced.
	pub fn retried_with(&self, token: &AccessToken) -> Self {
		let mut replay = Self { attempt: self.attempt.saturating_add(1), ..self.clone() };

		replay.authorize(token);

		replay
	}
}

/// Response handed back by a transport.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with no headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Replaces the response headers.
	pub fn with_headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;

		self
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw response body.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Lossy UTF-8 view of the body, used for error reporting.
	pub fn text_lossy(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default client keeps a cookie store so the HTTP-only session cookie set at login
/// travels with the refresh call, and never follows redirects so a 401/403 is observed as-is.
/// Configure any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds the default cookie-aware, non-redirecting transport.
	pub fn new() -> Result<Self> {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.redirect(Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type Error = ReqwestError;

	fn execute(&self, request: ApiRequest) -> TransportFuture<'_, Self::Error> {
		let client = self.0.clone();

		Box::pin(async move {
			let ApiRequest { method, url, headers, body, .. } = request;
			let mut builder = client.request(method, url).headers(headers);

			if !body.is_empty() {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse::new(status, body).with_headers(headers))
		})
	}
}
