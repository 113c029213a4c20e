// self
use crate::{
	_prelude::*,
	obs::{FlowKind, RefreshDecision, record_decision_metric},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by pipeline flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("reissue.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event (and a metric) for a single-flight decision on `path`.
pub fn record_decision(decision: RefreshDecision, path: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(decision = decision.as_str(), path, "refresh coordinator decision");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = path;
	}

	record_decision_metric(decision);
}

/// Emits a warning for a pipeline condition that is tolerated rather than surfaced.
pub fn warn_tolerated(message: &'static str, detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%detail, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (message, detail);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn decision_recording_noop_without_tracing() {
		record_decision(RefreshDecision::Lead, "/a");
		warn_tolerated("ignored", &"detail");
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
