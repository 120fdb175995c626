// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::sync::Barrier;
// self
use token_steward::{
	_preludet::*,
	error::{AuthorizationError, Error},
	steward::Steward,
};

fn build_steward(authority: Arc<ScriptedAuthority>) -> Arc<Steward> {
	Arc::new(
		Steward::builder()
			.with_authority(authority)
			.slot(identity_slot_spec("blob-storage-access"))
			.build()
			.expect("Steward fixture should build."),
	)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_concurrent_misses_cost_one_acquisition() {
	let authority =
		Arc::new(ScriptedAuthority::fresh(Duration::hours(1)).with_delay(StdDuration::from_millis(200)));
	let steward = build_steward(authority.clone());
	let barrier = Arc::new(Barrier::new(50));
	let tasks: Vec<_> = (0..50)
		.map(|_| {
			let steward = steward.clone();
			let barrier = barrier.clone();

			tokio::spawn(async move {
				barrier.wait().await;

				steward.get_credential(&slot_name("blob-storage-access"), Duration::minutes(1)).await
			})
		})
		.collect();
	let mut secrets = Vec::with_capacity(50);

	for task in tasks {
		let credential = task
			.await
			.expect("Caller task should not panic.")
			.expect("Every caller should receive the shared credential.");

		secrets.push(credential.secret().expose().to_owned());
	}

	assert_eq!(authority.calls(), 1, "exactly one call may reach the provider");
	assert!(
		secrets.iter().all(|secret| secret == &secrets[0]),
		"every caller must observe the identical credential",
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_concurrent_misses_share_one_failure() {
	let authority =
		Arc::new(ScriptedAuthority::fresh(Duration::hours(1)).with_delay(StdDuration::from_millis(200)));

	authority.queue_failure(
		AuthorizationError::Denied { message: "missing role assignment".into(), status: Some(403) }
			.into(),
	);

	let steward = build_steward(authority.clone());
	let barrier = Arc::new(Barrier::new(50));
	let tasks: Vec<_> = (0..50)
		.map(|_| {
			let steward = steward.clone();
			let barrier = barrier.clone();

			tokio::spawn(async move {
				barrier.wait().await;

				steward.get_credential(&slot_name("blob-storage-access"), Duration::minutes(1)).await
			})
		})
		.collect();
	let expected: Error =
		AuthorizationError::Denied { message: "missing role assignment".into(), status: Some(403) }
			.into();

	for task in tasks {
		let outcome = task.await.expect("Caller task should not panic.");

		assert_eq!(
			outcome.expect_err("Every caller should observe the leader's failure."),
			expected,
		);
	}

	assert_eq!(authority.calls(), 1, "the failure must not fan out into a thundering herd");
}

#[tokio::test]
async fn a_fresh_cache_short_circuits_the_gate() {
	let authority = Arc::new(ScriptedAuthority::fresh(Duration::hours(1)));
	let steward = build_steward(authority.clone());
	let name = slot_name("blob-storage-access");

	steward
		.get_credential(&name, Duration::minutes(1))
		.await
		.expect("Initial miss should refresh.");

	for _ in 0..10 {
		steward
			.get_credential(&name, Duration::minutes(1))
			.await
			.expect("Cache hits should not touch the provider.");
	}

	assert_eq!(authority.calls(), 1);
}
