//! The authenticated client pipeline.
//!
//! Every call passes through the outbound decorator, the transport, and, on failure, the refresh
//! coordinator. The coordinator either surfaces the failure, replays the request once with a
//! fresher token, queues it behind the refresh already in flight, or drives a new refresh.

pub mod coordinator;
pub mod decorate;
pub mod queue;
pub mod refresh;
pub mod teardown;

pub use coordinator::*;
pub use decorate::*;
pub use queue::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenStore},
	config::ClientConfig,
	error::{ConfigError, TransportError},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::SessionSurface,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// HTTP client that keeps a short-lived access token fresh transparently.
///
/// One instance (and its clones) is one client session: the token store, the refresh state,
/// and the waiter queue are shared by every clone and by nothing else. Clones are cheap and can
/// be moved into spawned tasks.
pub struct AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request, including the refresh call.
	pub transport: Arc<T>,
	/// Cookie, marker, and navigation surface.
	pub surface: Arc<dyn SessionSurface>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	config: Arc<ClientConfig>,
	executor: Arc<RefreshExecutor>,
	tokens: TokenStore,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over the caller-provided transport and surface.
	///
	/// The configuration is validated again so deserialized values are held to the same rules
	/// as built ones.
	pub fn with_transport(
		config: ClientConfig,
		transport: impl Into<Arc<T>>,
		surface: Arc<dyn SessionSurface>,
	) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		let executor = RefreshExecutor::from_config(&config)?;

		Ok(Self {
			transport: transport.into(),
			surface,
			refresh_metrics: Default::default(),
			config: Arc::new(config),
			executor: Arc::new(executor),
			tokens: TokenStore::default(),
			coordinator: Default::default(),
		})
	}

	/// Sends `request` through the full pipeline.
	///
	/// Success statuses resolve to the response. An authentication failure on an eligible
	/// request is absorbed: the request is replayed once with a fresh token and the caller sees
	/// only the replay's outcome.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Send;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Sends a login call, installs the returned token, and marks the session active.
	///
	/// Authentication failures on the login endpoint are always terminal.
	pub async fn login(&self, request: ApiRequest) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<AccessToken> = span
			.instrument(async move {
				let response = self.dispatch(request).await?;
				let token = AccessToken::from_json_body(response.body(), &self.config.token_pointer)
					.ok()
					.flatten()
					.ok_or(ConfigError::MissingLoginToken)?;

				self.tokens.set(token.clone());
				self.surface.mark_session(&self.config.session_marker)?;

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Installs a token obtained out of band (e.g., a login handled elsewhere).
	pub fn install_token(&self, token: impl Into<String>) {
		self.tokens.set(AccessToken::new(token));
	}

	/// Current access token, if any.
	pub fn token(&self) -> Option<AccessToken> {
		self.tokens.get()
	}

	/// Token store shared by this client session.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Configuration this client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.coordinator.is_refreshing()
	}

	/// Number of requests waiting on the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.coordinator.pending()
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		loop {
			self.decorate(&mut request);

			let response = self.execute(request.clone()).await?;

			if response.is_success() {
				return Ok(response);
			}

			request = self.recover(request, response).await?;
		}
	}

	async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.transport
			.execute(request)
			.await
			.map_err(|e| Error::Transport(TransportError::network(e)))
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client backed by the default cookie-aware reqwest transport.
	pub fn new(config: ClientConfig, surface: Arc<dyn SessionSurface>) -> Result<Self> {
		Self::with_transport(config, ReqwestTransport::new()?, surface)
	}
}
impl<T> Clone for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			surface: Arc::clone(&self.surface),
			refresh_metrics: Arc::clone(&self.refresh_metrics),
			config: Arc::clone(&self.config),
			executor: Arc::clone(&self.executor),
			tokens: self.tokens.clone(),
			coordinator: Arc::clone(&self.coordinator),
		}
	}
}
impl<T> Debug for AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("token_set", &self.tokens.is_set())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}
