// self
use crate::obs::{RefreshOutcome, RefreshReason};

/// Records a refresh outcome via the global metrics recorder (when enabled).
pub fn record_refresh_outcome(reason: RefreshReason, outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"token_steward_refresh_total",
			"reason" => reason.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (reason, outcome);
	}
}
