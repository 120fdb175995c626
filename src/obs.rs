//! Optional observability helpers for credential refreshes.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `token_steward.refresh` with the
//!   `slot`, `reason` (trigger), and `stage` (call site) fields.
//! - Enable `metrics` to increment the `token_steward_refresh_total` counter for every
//!   attempt/success/failure, labeled by `reason` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Refresh triggers observed by the steward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshReason {
	/// A request-path caller missed the cache.
	RequestMiss,
	/// The background scheduler forced a proactive refresh.
	Scheduled,
	/// An operator or test forced a refresh.
	Manual,
}
impl RefreshReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshReason::RequestMiss => "request_miss",
			RefreshReason::Scheduled => "scheduled",
			RefreshReason::Manual => "manual",
		}
	}
}
impl Display for RefreshReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// Entry to a steward refresh helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Attempt => "attempt",
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
