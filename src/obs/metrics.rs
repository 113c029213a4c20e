// self
use crate::obs::{FlowKind, FlowOutcome, RefreshDecision};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"reissue_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a single-flight decision via the global metrics recorder (when enabled).
pub fn record_decision_metric(decision: RefreshDecision) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("reissue_refresh_decision_total", "decision" => decision.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = decision;
	}
}
