//! Background refresh loop that keeps every slot ahead of expiry.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, obs::RefreshReason, steward::Steward};

/// Default wake interval; comfortably under the shortest lifetime common authorities
/// issue (60 minutes).
pub const DEFAULT_INTERVAL: StdDuration = StdDuration::from_secs(45 * 60);

/// Long-lived control loop that proactively refreshes every registered slot.
///
/// The loop is independent of request traffic: each tick forces a refresh regardless of
/// remaining TTL (the goal is staying ahead of expiry, not reacting to it), then rebuilds
/// any resources bound to the slot. One slot's failure never blocks the others; the
/// previous credential stays usable through the cache until its real expiry, and the
/// failed slot is retried on the next tick.
pub struct RefreshScheduler {
	steward: Arc<Steward>,
	interval: StdDuration,
	shutdown: CancellationToken,
}
impl RefreshScheduler {
	/// Creates a scheduler with [`DEFAULT_INTERVAL`].
	pub fn new(steward: Arc<Steward>) -> Self {
		Self { steward, interval: DEFAULT_INTERVAL, shutdown: CancellationToken::new() }
	}

	/// Overrides the wake interval.
	pub fn with_interval(mut self, interval: StdDuration) -> Self {
		self.interval = interval;

		self
	}

	/// Token that stops the loop promptly when cancelled; no sleep survives shutdown.
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// Spawns the loop onto the current tokio runtime.
	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(self.run())
	}

	/// Runs the loop until the shutdown token is cancelled.
	pub async fn run(self) {
		loop {
			tokio::select! {
				() = self.shutdown.cancelled() => break,
				() = tokio::time::sleep(self.interval) => self.tick().await,
			}
		}
	}

	/// One proactive pass over every slot; public so operational triggers and tests can
	/// drive a pass without waiting out the interval.
	pub async fn tick(&self) {
		for name in self.steward.slot_names() {
			if let Err(error) = self.steward.refresh_slot(&name, RefreshReason::Scheduled).await {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					slot = %name,
					kind = error.kind_label(),
					error = %error,
					"proactive refresh failed",
				);
				#[cfg(not(feature = "tracing"))]
				let _ = error;
			}
			if let Err(error) = self.steward.rebuild_bindings(&name).await {
				#[cfg(feature = "tracing")]
				tracing::warn!(
					slot = %name,
					kind = error.kind_label(),
					error = %error,
					"dependent resource rebuild failed",
				);
				#[cfg(not(feature = "tracing"))]
				let _ = error;
			}
		}
	}
}
impl Debug for RefreshScheduler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshScheduler").field("interval", &self.interval).finish()
	}
}
