// self
use crate::obs::HandleOutcome;

/// Records a handling outcome via the global metrics recorder (when enabled).
pub fn record_outcome(outcome: HandleOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("queue_relay_outcome_total", "outcome" => outcome.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}
