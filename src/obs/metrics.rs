// self
use crate::obs::{FlowKind, FlowOutcome};

/// Counter incremented once per attempt and once per terminal outcome of every observed call.
pub const FLOW_COUNTER: &str = "bearer_broker_flow_total";

/// Records a flow outcome via the global metrics recorder (when enabled).
///
/// Labels: `flow` ([`FlowKind::as_str`]) and `outcome` ([`FlowOutcome::as_str`]).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(FLOW_COUNTER, "flow" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
