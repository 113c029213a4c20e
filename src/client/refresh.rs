//! Refresh executor and the leader side of the single-flight cycle.
//!
//! The executor performs exactly one `POST` to the refresh endpoint with no body. The HTTP-only
//! session cookie rides along through the transport and the CSRF header through the outbound
//! decorator; the `Authorization` header is always stripped. A usable token is installed in the
//! store before the cycle settles, so waiters never observe a settled phase with a stale store.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	client::{AuthClient, Join, RefreshTicket},
	config::{ClientConfig, ConfigBuildError},
	error::{ConfigError, RefreshError, TransportError},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RefreshDecision},
};

/// Prepared refresh call derived from a validated [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct RefreshExecutor {
	url: Url,
	token_pointer: String,
	timeout: Duration,
	deadline: StdDuration,
}
impl RefreshExecutor {
	/// Resolves the refresh endpoint and timeout from `config`.
	pub fn from_config(config: &ClientConfig) -> Result<Self> {
		let deadline = StdDuration::try_from(config.refresh_timeout)
			.map_err(|_| ConfigError::from(ConfigBuildError::NonPositiveTimeout))?;

		Ok(Self {
			url: config.refresh_url()?,
			token_pointer: config.token_pointer.clone(),
			timeout: config.refresh_timeout,
			deadline,
		})
	}

	/// Undecorated refresh request.
	pub fn request(&self) -> ApiRequest {
		ApiRequest::post(self.url.clone())
	}

	/// Upper bound applied to one refresh call.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Interprets the refresh endpoint's response.
	pub fn token_from(&self, response: &ApiResponse) -> Result<AccessToken, RefreshError> {
		if !response.is_success() {
			return Err(RefreshError::Rejected { status: response.status().as_u16() });
		}

		AccessToken::from_json_body(response.body(), &self.token_pointer)
			.map_err(|e| RefreshError::MalformedResponse { message: e.to_string() })?
			.ok_or(RefreshError::MissingToken)
	}
}

impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Refreshes the access token immediately, joining a refresh already in flight.
	///
	/// Useful to restore a session at startup from the session cookie alone. A failure tears the
	/// session down exactly like a failed refresh triggered by a request.
	pub async fn refresh_now(&self) -> Result<AccessToken> {
		loop {
			match self.coordinator.join() {
				Join::Lead(ticket) => {
					obs::record_decision(RefreshDecision::Lead, "refresh_now");

					return self.lead_refresh(ticket).await;
				},
				Join::Wait(handle) => {
					obs::record_decision(RefreshDecision::Queue, "refresh_now");
					self.refresh_metrics.record_queued();

					match handle.settled().await {
						Ok(settled) => return Ok(settled.token),
						Err(RefreshError::Abandoned) => continue,
						Err(e) => return Err(e.into()),
					}
				},
			}
		}
	}

	/// Runs the refresh call and settles `ticket` with its outcome.
	///
	/// On failure the session is torn down before the waiters are released.
	pub(crate) async fn lead_refresh(&self, ticket: RefreshTicket) -> Result<AccessToken> {
		match self.execute_refresh().await {
			Ok(token) => {
				ticket.settle(Ok(&token));

				Ok(token)
			},
			Err(e) => {
				obs::record_decision(RefreshDecision::Teardown, self.executor.url.path());

				// The store must be empty before the phase returns to idle.
				self.tear_down();
				ticket.settle(Err(&e));

				Err(e.into())
			},
		}
	}

	/// Performs one refresh call and installs the token it returns.
	///
	/// The store is left untouched on failure; teardown is the caller's decision.
	pub(crate) async fn execute_refresh(&self) -> Result<AccessToken, RefreshError> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "execute_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async {
				let mut request = self.executor.request();

				self.decorate(&mut request);

				let response =
					tokio::time::timeout(self.executor.deadline, self.transport.execute(request))
						.await
						.map_err(|_| RefreshError::TimedOut { after: self.executor.timeout })?
						.map_err(|e| RefreshError::from(TransportError::network(e)))?;

				self.executor.token_from(&response)
			})
			.await;

		match &result {
			Ok(token) => {
				self.tokens().set(token.clone());
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::test_config,
		http::{Method, StatusCode},
	};

	fn executor() -> RefreshExecutor {
		RefreshExecutor::from_config(&test_config()).expect("Executor should build from defaults.")
	}

	#[test]
	fn request_targets_refresh_endpoint_with_post() {
		let request = executor().request();

		assert_eq!(request.method(), &Method::POST);
		assert_eq!(request.url().as_str(), "https://api.example.com/auth/reissue");
		assert!(request.body().is_empty());
		assert_eq!(executor().timeout(), Duration::seconds(10));
	}

	#[test]
	fn token_from_maps_every_failure_shape() {
		let executor = executor();
		let respond = |status: u16, body: &str| {
			ApiResponse::new(
				StatusCode::from_u16(status).expect("Fixture status should be valid."),
				body.as_bytes().to_vec(),
			)
		};

		assert_eq!(
			executor
				.token_from(&respond(200, r#"{"data":{"accessToken":"T2"}}"#))
				.expect("Token should be extracted.")
				.expose(),
			"T2"
		);
		assert!(matches!(
			executor.token_from(&respond(401, "{}")),
			Err(RefreshError::Rejected { status: 401 })
		));
		assert!(matches!(
			executor.token_from(&respond(200, r#"{"data":{}}"#)),
			Err(RefreshError::MissingToken)
		));
		assert!(matches!(
			executor.token_from(&respond(200, r#"{"data":{"accessToken":"  "}}"#)),
			Err(RefreshError::MissingToken)
		));
		assert!(matches!(
			executor.token_from(&respond(200, "<html>")),
			Err(RefreshError::MalformedResponse { .. })
		));
	}
}
