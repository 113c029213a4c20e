//! Failure classification and the single-flight refresh state machine.
//!
//! [`RefreshCoordinator`] owns the refresh phase and the [`WaiterQueue`] behind one lock, so
//! deciding between leading a refresh, waiting on the one in flight, and replaying with a token
//! that is already newer happens atomically. The leader holds a [`RefreshTicket`]; settling it
//! (or dropping it) returns the phase to idle and drains the queue in one step.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenState, TokenStore},
	client::{AuthClient, Settled, WaiterHandle, WaiterQueue},
	config::ClientConfig,
	error::{RefreshError, TerminalReason},
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, RefreshDecision},
};

/// How a non-success response is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
	/// Authentication failure that a refresh can recover.
	TransientAuth,
	/// Authentication failure surfaced to the caller as-is.
	TerminalAuth(TerminalReason),
	/// Any other failure; surfaced without touching the refresh state.
	NonAuth,
}

/// Classifies a failed response to `request`.
pub fn classify(config: &ClientConfig, request: &ApiRequest, status: u16) -> FailureClass {
	if !config.is_auth_failure(status) {
		FailureClass::NonAuth
	} else if config.is_exempt(request.url()) {
		FailureClass::TerminalAuth(TerminalReason::Exempt)
	} else if request.is_retry() {
		FailureClass::TerminalAuth(TerminalReason::AlreadyRetried)
	} else if !request.is_authorized() {
		FailureClass::TerminalAuth(TerminalReason::Anonymous)
	} else {
		FailureClass::TransientAuth
	}
}

/// Refresh phase of one client session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No refresh call is in flight.
	#[default]
	Idle,
	/// A refresh call is in flight; new authentication failures wait on it.
	Refreshing,
}

/// Admission decision for a request that failed with a recoverable authentication error.
#[derive(Debug)]
pub enum Admission {
	/// The caller drives the refresh and replays `request` afterward.
	Lead {
		/// Ticket that settles the refresh cycle.
		ticket: RefreshTicket,
		/// The request that tripped the refresh.
		request: ApiRequest,
	},
	/// The caller waits on the refresh already in flight.
	Wait(WaiterHandle),
	/// The store already holds a newer token; replay immediately.
	Replay(ApiRequest),
	/// No token is installed anymore; the session has ended.
	Terminal,
}

/// Outcome of joining the refresh cycle without a request to replay.
#[derive(Debug)]
pub enum Join {
	/// The caller drives a new refresh.
	Lead(RefreshTicket),
	/// The caller waits on the refresh already in flight.
	Wait(WaiterHandle),
}

#[derive(Debug, Default)]
struct CoordinatorState {
	phase: RefreshPhase,
	waiters: WaiterQueue,
}

/// Single-flight refresh state shared by every clone of one client session.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<CoordinatorState>,
}
impl RefreshCoordinator {
	/// Decides how `request` recovers from an authentication failure.
	///
	/// The stored token is consulted under the coordinator lock: an ended store means the
	/// session was torn down, and a stored token that differs from the one `request` carried
	/// means a refresh already completed after the request went out. A store that never held
	/// a token leads a refresh, since the caller authorized the request itself.
	pub fn admit(self: &Arc<Self>, request: ApiRequest, tokens: &TokenStore) -> Admission {
		let mut state = self.state.lock();

		if state.phase == RefreshPhase::Refreshing {
			return Admission::Wait(state.waiters.enqueue(Some(request)));
		}

		match tokens.state() {
			TokenState::Ended => return Admission::Terminal,
			TokenState::Active(current) =>
				if let Some(carried) = request.bearer() {
					if carried != current.expose() {
						return Admission::Replay(request.retried_with(&current));
					}
				},
			TokenState::Vacant => {},
		}

		state.phase = RefreshPhase::Refreshing;

		Admission::Lead { ticket: RefreshTicket::new(self), request }
	}

	/// Joins the in-flight refresh or starts a new one.
	pub fn join(self: &Arc<Self>) -> Join {
		let mut state = self.state.lock();

		match state.phase {
			RefreshPhase::Refreshing => Join::Wait(state.waiters.enqueue(None)),
			RefreshPhase::Idle => {
				state.phase = RefreshPhase::Refreshing;

				Join::Lead(RefreshTicket::new(self))
			},
		}
	}

	/// Current refresh phase.
	pub fn phase(&self) -> RefreshPhase {
		self.state.lock().phase
	}

	/// Returns `true` while a refresh call is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.phase() == RefreshPhase::Refreshing
	}

	/// Number of queued waiters.
	pub fn pending(&self) -> usize {
		self.state.lock().waiters.len()
	}

	fn finish(&self, outcome: Result<&AccessToken, &RefreshError>) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.phase = RefreshPhase::Idle;

			std::mem::take(&mut state.waiters)
		};

		waiters.flush(outcome)
	}
}

/// Exclusive right to settle the current refresh cycle.
///
/// Dropping an unsettled ticket (for example when the leading request is cancelled) returns
/// the coordinator to idle and resolves every waiter with [`RefreshError::Abandoned`].
#[derive(Debug)]
pub struct RefreshTicket {
	coordinator: Arc<RefreshCoordinator>,
	settled: bool,
}
impl RefreshTicket {
	fn new(coordinator: &Arc<RefreshCoordinator>) -> Self {
		Self { coordinator: Arc::clone(coordinator), settled: false }
	}

	/// Ends the refresh cycle and drains the waiter queue with `outcome`.
	///
	/// Returns how many waiters received the outcome.
	pub fn settle(mut self, outcome: Result<&AccessToken, &RefreshError>) -> usize {
		self.settled = true;

		self.coordinator.finish(outcome)
	}
}
impl Drop for RefreshTicket {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.finish(Err(&RefreshError::Abandoned));
		}
	}
}

impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Turns a failed response into the request to send next, or into the caller's error.
	pub(crate) async fn recover(
		&self,
		request: ApiRequest,
		response: ApiResponse,
	) -> Result<ApiRequest> {
		let status = response.status().as_u16();
		let path = request.url().path().to_owned();

		match classify(self.config(), &request, status) {
			FailureClass::NonAuth => {
				return Err(Error::Status { status, body: response.text_lossy() });
			},
			FailureClass::TerminalAuth(reason) => {
				obs::record_decision(RefreshDecision::Terminal, &path);

				return Err(Error::TerminalAuth { status, reason });
			},
			FailureClass::TransientAuth => (),
		}

		loop {
			match self.coordinator.admit(request.clone(), self.tokens()) {
				Admission::Lead { ticket, request } => {
					obs::record_decision(RefreshDecision::Lead, &path);

					let token = self.lead_refresh(ticket).await?;

					return Ok(request.retried_with(&token));
				},
				Admission::Wait(handle) => {
					obs::record_decision(RefreshDecision::Queue, &path);
					self.refresh_metrics.record_queued();

					match handle.settled().await {
						Ok(Settled { replay: Some(replay), .. }) => return Ok(replay),
						Ok(Settled { token, replay: None }) => return Ok(request.retried_with(&token)),
						// The leader went away; compete for the next cycle.
						Err(RefreshError::Abandoned) => continue,
						Err(e) => return Err(e.into()),
					}
				},
				Admission::Replay(replay) => {
					obs::record_decision(RefreshDecision::StaleReplay, &path);

					return Ok(replay);
				},
				Admission::Terminal => {
					obs::record_decision(RefreshDecision::Terminal, &path);

					return Err(Error::TerminalAuth { status, reason: TerminalReason::SessionEnded });
				},
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{get, test_config},
		http::{HeaderValue, header},
	};

	fn authorized(path: &str, token: &str) -> ApiRequest {
		let mut request = get(path);

		request.authorize(&AccessToken::new(token));

		request
	}

	fn store_with(token: &str) -> TokenStore {
		let tokens = TokenStore::default();

		tokens.set(AccessToken::new(token));

		tokens
	}

	#[test]
	fn classification_follows_precedence() {
		let config = test_config();

		assert_eq!(classify(&config, &authorized("/a", "T1"), 500), FailureClass::NonAuth);
		assert_eq!(classify(&config, &authorized("/a", "T1"), 401), FailureClass::TransientAuth);
		assert_eq!(classify(&config, &authorized("/a", "T1"), 403), FailureClass::TransientAuth);
		assert_eq!(
			classify(&config, &authorized("/auth/reissue", "T1"), 401),
			FailureClass::TerminalAuth(TerminalReason::Exempt)
		);
		assert_eq!(
			classify(&config, &get("/auth/login"), 401),
			FailureClass::TerminalAuth(TerminalReason::Exempt)
		);
		assert_eq!(
			classify(&config, &authorized("/a", "T1").retried_with(&AccessToken::new("T2")), 401),
			FailureClass::TerminalAuth(TerminalReason::AlreadyRetried)
		);
		assert_eq!(
			classify(&config, &get("/a"), 401),
			FailureClass::TerminalAuth(TerminalReason::Anonymous)
		);
	}

	#[test]
	fn non_bearer_authorization_still_counts_as_authorized() {
		let request = get("/a")
			.with_header(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

		assert_eq!(classify(&test_config(), &request, 401), FailureClass::TransientAuth);
	}

	#[test]
	fn second_admission_waits_on_the_first() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let tokens = store_with("T1");
		let first = coordinator.admit(authorized("/a", "T1"), &tokens);
		let second = coordinator.admit(authorized("/b", "T1"), &tokens);

		assert!(matches!(first, Admission::Lead { .. }));
		assert!(matches!(second, Admission::Wait(_)));
		assert!(coordinator.is_refreshing());
		assert_eq!(coordinator.pending(), 1);
	}

	#[test]
	fn newer_stored_token_replays_without_refreshing() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let tokens = store_with("T2");

		match coordinator.admit(authorized("/a", "T1"), &tokens) {
			Admission::Replay(replay) => {
				assert_eq!(replay.bearer(), Some("T2"));
				assert!(replay.is_retry());
			},
			other => panic!("Unexpected admission: {other:?}."),
		}

		assert_eq!(coordinator.phase(), RefreshPhase::Idle);
	}

	#[test]
	fn ended_store_ends_the_session() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let tokens = store_with("T1");

		tokens.clear();

		assert!(matches!(coordinator.admit(authorized("/a", "T1"), &tokens), Admission::Terminal));
		assert!(!coordinator.is_refreshing());
	}

	#[test]
	fn vacant_store_leads_for_caller_authorization() {
		let coordinator = Arc::new(RefreshCoordinator::default());

		assert!(matches!(
			coordinator.admit(authorized("/a", "external"), &TokenStore::default()),
			Admission::Lead { .. }
		));
		assert!(coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn settling_drains_waiters_in_order() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let tokens = store_with("T1");
		let Admission::Lead { ticket, .. } = coordinator.admit(authorized("/a", "T1"), &tokens)
		else {
			panic!("First admission should lead.");
		};
		let wait = |path| match coordinator.admit(authorized(path, "T1"), &tokens) {
			Admission::Wait(handle) => handle,
			other => panic!("Unexpected admission: {other:?}."),
		};
		let handles = [wait("/b"), wait("/c"), wait("/d")];

		assert_eq!(ticket.settle(Ok(&AccessToken::new("T2"))), 3);
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.pending(), 0);

		for (handle, path) in handles.into_iter().zip(["/b", "/c", "/d"]) {
			let replay = handle
				.settled()
				.await
				.expect("Waiter should resolve successfully.")
				.replay
				.expect("Waiter should carry its replay.");

			assert_eq!(replay.url().path(), path);
			assert_eq!(replay.bearer(), Some("T2"));
		}
	}

	#[tokio::test]
	async fn dropped_ticket_abandons_waiters_and_resets_phase() {
		let coordinator = Arc::new(RefreshCoordinator::default());
		let Join::Lead(ticket) = coordinator.join() else {
			panic!("Idle coordinator should hand out the lead.");
		};
		let Join::Wait(handle) = coordinator.join() else {
			panic!("Refreshing coordinator should queue the caller.");
		};

		drop(ticket);

		assert_eq!(coordinator.phase(), RefreshPhase::Idle);
		assert!(matches!(handle.settled().await, Err(RefreshError::Abandoned)));
	}
}
