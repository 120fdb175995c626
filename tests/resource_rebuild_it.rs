// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use token_steward::{
	_preludet::*,
	cred::Credential,
	error::TransientError,
	resource::{BuildFuture, CloseFuture, ResourceBinding, ResourceFactory},
	scheduler::RefreshScheduler,
	steward::Steward,
};

struct PoolStub {
	id: u64,
	secret: String,
}

type EventLog = Arc<Mutex<Vec<String>>>;

struct RecordingFactory {
	builds: AtomicU64,
	events: EventLog,
	failures_left: AtomicU64,
}
impl RecordingFactory {
	fn new(events: EventLog) -> Self {
		Self { builds: AtomicU64::new(0), events, failures_left: AtomicU64::new(0) }
	}

	fn fail_times(self, failures: u64) -> Self {
		self.failures_left.store(failures, Ordering::SeqCst);

		self
	}
}
impl ResourceFactory for RecordingFactory {
	type Resource = PoolStub;

	fn build<'a>(&'a self, credential: &'a Credential) -> BuildFuture<'a, Self::Resource> {
		Box::pin(async move {
			if self
				.failures_left
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
				.is_ok()
			{
				self.events.lock().push("build-failed".into());

				return Err(TransientError::Network { message: "pool handshake failed".into() }.into());
			}

			let id = self.builds.fetch_add(1, Ordering::SeqCst) + 1;

			self.events.lock().push(format!("build:{id}"));

			Ok(PoolStub { id, secret: credential.secret().expose().to_owned() })
		})
	}

	fn close(&self, resource: Arc<Self::Resource>) -> CloseFuture<'_> {
		Box::pin(async move {
			self.events.lock().push(format!("close:{}", resource.id));
		})
	}
}

fn build_steward(authority: Arc<ScriptedAuthority>) -> Arc<Steward> {
	Arc::new(
		Steward::builder()
			.with_authority(authority)
			.slot(identity_slot_spec("database-access"))
			.build()
			.expect("Steward fixture should build."),
	)
}

#[tokio::test]
async fn rotation_rebuilds_once_and_closes_the_old_pool_after_publishing() {
	let authority = Arc::new(ScriptedAuthority::fresh(Duration::hours(1)));
	let steward = build_steward(authority);
	let name = slot_name("database-access");
	let events: EventLog = EventLog::default();
	let binding = Arc::new(ResourceBinding::new(RecordingFactory::new(events.clone())));

	steward.bind(&name, binding.clone()).expect("Binding a registered slot should succeed.");

	let scheduler = RefreshScheduler::new(steward.clone());

	// First tick: generation 1, initial pool built from token-1.
	scheduler.tick().await;

	let first = binding.live().expect("A pool should be live after the first tick.");

	assert_eq!(first.secret, "token-1");
	assert_eq!(binding.live_generation(), Some(1));

	// Second tick rotates to generation 2: exactly one rebuild, the live reference
	// changes exactly once, and the old pool closes only after the swap.
	scheduler.tick().await;

	let second = binding.live().expect("A pool should be live after the rotation.");

	assert_eq!(second.secret, "token-2");
	assert_eq!(binding.live_generation(), Some(2));
	assert_eq!(events.lock().clone(), vec!["build:1", "build:2", "close:1"]);

	let metrics = steward.metrics();

	assert_eq!(metrics.rebuild_attempts(), 2);
	assert_eq!(metrics.rebuild_failures(), 0);
}

#[tokio::test]
async fn failed_rebuilds_keep_the_stale_pool_until_the_next_tick() {
	let authority = Arc::new(ScriptedAuthority::fresh(Duration::hours(1)));
	let steward = build_steward(authority);
	let name = slot_name("database-access");
	let events: EventLog = EventLog::default();
	let binding = Arc::new(ResourceBinding::new(RecordingFactory::new(events.clone())));

	steward.bind(&name, binding.clone()).expect("Binding a registered slot should succeed.");

	let scheduler = RefreshScheduler::new(steward.clone());

	scheduler.tick().await;
	assert_eq!(binding.live_generation(), Some(1));
	binding.live().expect("Initial pool should be live.");

	{
		// A second binding whose first build fails; the failure is consumed by the
		// second tick's rebuild.
		let rigged = RecordingFactory::new(events.clone()).fail_times(1);
		let rigged_binding = Arc::new(ResourceBinding::new(rigged));

		steward
			.bind(&name, rigged_binding.clone())
			.expect("Binding a second resource should succeed.");

		scheduler.tick().await;

		// The rigged binding failed its first build and stays empty; the original
		// binding rebuilt to generation 2.
		assert!(rigged_binding.live().is_none(), "a failed first build leaves nothing live");
		assert_eq!(binding.live_generation(), Some(2));
		assert!(
			steward
				.last_error(&name)
				.expect("Diagnostics for a registered slot should be available.")
				.is_some(),
			"the rebuild failure must land in the slot's error cache",
		);

		// Next tick retries the rigged binding and catches it up.
		scheduler.tick().await;

		assert_eq!(rigged_binding.live_generation(), Some(3));
		assert_eq!(binding.live_generation(), Some(3));
	}

	let metrics = steward.metrics();

	assert_eq!(metrics.rebuild_failures(), 1);
}
