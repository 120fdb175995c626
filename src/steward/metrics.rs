// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for refresh and rebuild outcomes.
#[derive(Debug, Default)]
pub struct RotationMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	rebuild_attempts: AtomicU64,
	rebuild_failures: AtomicU64,
}
impl RotationMetrics {
	/// Returns the total number of refresh attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refreshes (including cache reuses by followers).
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Returns the number of failed refreshes.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the total number of resource rebuild attempts.
	pub fn rebuild_attempts(&self) -> u64 {
		self.rebuild_attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of failed resource rebuilds.
	pub fn rebuild_failures(&self) -> u64 {
		self.rebuild_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rebuild_attempt(&self) {
		self.rebuild_attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rebuild_failure(&self) {
		self.rebuild_failures.fetch_add(1, Ordering::Relaxed);
	}
}
