// self
use crate::{_prelude::*, error::Failure, obs::FlowKind, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client calls and flows.
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
			let span = tracing::info_span!("bearer_broker.flow", flow = kind.as_str(), stage);

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

/// Reports a token store operation that failed and was degraded to a no-op.
pub fn store_degraded(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, %error, "token store operation failed; treating as absent");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}

/// Reports that a 401 joined an exchange already in flight.
pub fn refresh_coalesced(waiting: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(waiting, "refresh already in flight; queued behind it");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = waiting;
	}
}

/// Reports the settled outcome of a refresh exchange.
pub fn refresh_settled(outcome: Result<(), &Failure>, released: usize) {
	#[cfg(feature = "tracing")]
	match outcome {
		Ok(()) => tracing::debug!(released, "refresh exchange succeeded"),
		Err(failure) => tracing::warn!(
			released,
			status = failure.status,
			message = %failure.message,
			"refresh exchange failed; session invalidated"
		),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (outcome, released);
	}
}
