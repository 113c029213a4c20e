//! Optional observability helpers for the client pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `reissue.flow` with the `flow` (pipeline
//!   entry point) and `stage` (call site) fields, plus debug events for every single-flight
//!   decision.
//! - Enable `metrics` to increment the `reissue_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `reissue_refresh_decision_total` counter labeled by `decision`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline entry points observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Ordinary request through [`AuthClient::send`](crate::client::AuthClient::send).
	Send,
	/// Refresh executor call.
	Refresh,
	/// Login call.
	Login,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Send => "send",
			FlowKind::Refresh => "refresh",
			FlowKind::Login => "login",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a pipeline helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What the coordinator decided for one authentication failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshDecision {
	/// The request drives a new refresh.
	Lead,
	/// The request waits on the in-flight refresh.
	Queue,
	/// The store already holds a newer token; the request replays with it.
	StaleReplay,
	/// The session is gone; the failure is surfaced.
	Terminal,
	/// The refresh failed and the session was torn down.
	Teardown,
}
impl RefreshDecision {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshDecision::Lead => "lead",
			RefreshDecision::Queue => "queue",
			RefreshDecision::StaleReplay => "stale_replay",
			RefreshDecision::Terminal => "terminal",
			RefreshDecision::Teardown => "teardown",
		}
	}
}
impl Display for RefreshDecision {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
