//! Single-flight gate collapsing concurrent acquisitions into one backend call.

// self
use crate::{_prelude::*, cred::Credential};

/// Collapses N concurrent refresh attempts for one slot into a single acquisition.
///
/// The gate has exactly two states: idle (no acquisition in flight) and acquiring (one
/// leader running the backend call, followers parked on the async guard). A follower that
/// wakes after the leader finished receives a clone of that leader's outcome instead of
/// starting a second acquisition; success and failure are replayed alike. The identity
/// and secret backends this crate fronts are rate limited, so a thundering herd of
/// per-request acquisitions can itself trigger throttling failures.
///
/// No blocking lock is held across the backend call: the inner mutex guards only the
/// attempt bookkeeping and is held for microseconds.
#[derive(Debug, Default)]
pub struct RefreshGate {
	guard: AsyncMutex<()>,
	state: Mutex<GateState>,
}

#[derive(Debug, Default)]
struct GateState {
	attempts: u64,
	outcome: Option<Result<Credential>>,
}

impl RefreshGate {
	/// Creates an idle gate.
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `acquire` unless another caller is already mid-acquisition, in which case the
	/// caller suspends and receives a clone of that leader's outcome.
	///
	/// The closure performs the backend call and any cache publication; it runs at most
	/// once per completed gate pass no matter how many callers pile up. A caller arriving
	/// after the pass completed starts a fresh one, so stale outcomes are never replayed
	/// to late arrivals.
	pub async fn run<F, Fut>(&self, acquire: F) -> Result<Credential>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Credential>>,
	{
		let observed = self.state.lock().attempts;
		let _leader = self.guard.lock().await;
		let replay = {
			let state = self.state.lock();

			if state.attempts > observed { state.outcome.clone() } else { None }
		};

		if let Some(outcome) = replay {
			return outcome;
		}

		let outcome = acquire().await;
		let mut state = self.state.lock();

		state.attempts += 1;
		state.outcome = Some(outcome.clone());

		outcome
	}

	/// Number of completed acquisition passes, successes and failures alike.
	pub fn attempts(&self) -> u64 {
		self.state.lock().attempts
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicU64, Ordering};
	// self
	use super::*;
	use crate::{
		cred::{Provenance, SecretString},
		error::TransientError,
	};

	fn credential(secret: &str) -> Credential {
		Credential::new(
			SecretString::new(secret),
			OffsetDateTime::now_utc() + Duration::hours(1),
			Provenance::IdentityExchange,
		)
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn followers_replay_the_leader_outcome() {
		let gate = Arc::new(RefreshGate::new());
		let calls = Arc::new(AtomicU64::new(0));
		let tasks: Vec<_> = (0..16)
			.map(|_| {
				let gate = gate.clone();
				let calls = calls.clone();

				tokio::spawn(async move {
					gate.run(|| async {
						calls.fetch_add(1, Ordering::SeqCst);
						tokio::time::sleep(std::time::Duration::from_millis(100)).await;

						Ok(credential("shared"))
					})
					.await
				})
			})
			.collect();

		for task in tasks {
			let outcome = task
				.await
				.expect("Gate task should not panic.")
				.expect("Gate pass should succeed.");

			assert_eq!(outcome.secret().expose(), "shared");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one acquisition must run");
		assert_eq!(gate.attempts(), 1);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn failures_are_replayed_identically() {
		let gate = Arc::new(RefreshGate::new());
		let error: Error = TransientError::Network { message: "connection reset".into() }.into();
		let tasks: Vec<_> = (0..8)
			.map(|_| {
				let gate = gate.clone();
				let error = error.clone();

				tokio::spawn(async move {
					gate.run(|| async {
						tokio::time::sleep(std::time::Duration::from_millis(100)).await;

						Err(error)
					})
					.await
				})
			})
			.collect();

		for task in tasks {
			let outcome = task.await.expect("Gate task should not panic.");

			assert_eq!(
				outcome.expect_err("Gate pass should fail."),
				Error::from(TransientError::Network { message: "connection reset".into() }),
			);
		}
	}

	#[tokio::test]
	async fn sequential_callers_each_start_a_fresh_pass() {
		let gate = RefreshGate::new();

		for expected in 1..=3 {
			gate.run(|| async { Ok(credential("fresh")) })
				.await
				.expect("Sequential gate pass should succeed.");

			assert_eq!(gate.attempts(), expected);
		}
	}
}
