//! Dependent resources rebuilt when their backing credential rotates.
//!
//! Some resources (pooled database connections) embed the secret in their own
//! configuration instead of presenting it per call. A [`ResourceBinding`] pairs such a
//! resource with the slot that feeds it: on rotation the replacement is built first,
//! published with an atomic reference swap, and only then is the previous instance
//! closed, so readers always observe either the fully-old or the fully-new resource.

// self
use crate::{_prelude::*, cred::Credential, error::TransientError, slot::CredentialSlot};

/// Boxed future returned by [`ResourceFactory::build`].
pub type BuildFuture<'a, R> = Pin<Box<dyn Future<Output = Result<R>> + 'a + Send>>;
/// Boxed future returned by [`ResourceFactory::close`].
pub type CloseFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;
/// Boxed future returned by [`RebuildHook::rebuild`].
pub type RebuildFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Factory building a resource from a credential and tearing it down on rotation.
pub trait ResourceFactory
where
	Self: Send + Sync,
{
	/// Concrete resource type (e.g. a connection pool handle).
	type Resource: Send + Sync;

	/// Builds a new resource from `credential`.
	fn build<'a>(&'a self, credential: &'a Credential) -> BuildFuture<'a, Self::Resource>;

	/// Releases a resource that is no longer live.
	fn close(&self, resource: Arc<Self::Resource>) -> CloseFuture<'_>;
}

/// Object-safe rebuild contract the steward drives after a slot rotates.
pub trait RebuildHook
where
	Self: Send + Sync,
{
	/// Rebuilds the dependent resource from the slot's current credential when the live
	/// generation lags the slot generation.
	fn rebuild<'a>(&'a self, slot: &'a CredentialSlot) -> RebuildFuture<'a>;
}

struct LiveResource<R> {
	resource: Arc<R>,
	generation: u64,
}

/// Pairs a slot with a factory and the resource currently built from it.
///
/// The live reference is the only shared mutable pointer outside the slot itself, and it
/// is only ever replaced wholesale, never edited in place. Rebuilds are serialized by an
/// async guard so overlapping scheduler ticks and manual triggers cannot double-build.
pub struct ResourceBinding<F>
where
	F: ResourceFactory,
{
	factory: F,
	live: RwLock<Option<LiveResource<F::Resource>>>,
	rebuild_guard: AsyncMutex<()>,
}
impl<F> ResourceBinding<F>
where
	F: ResourceFactory,
{
	/// Creates a binding with no live resource yet.
	pub fn new(factory: F) -> Self {
		Self { factory, live: RwLock::new(None), rebuild_guard: AsyncMutex::new(()) }
	}

	/// Returns the currently live resource, if one has been built.
	pub fn live(&self) -> Option<Arc<F::Resource>> {
		self.live.read().as_ref().map(|live| Arc::clone(&live.resource))
	}

	/// Generation the live resource was built from; always ≤ the slot's generation.
	pub fn live_generation(&self) -> Option<u64> {
		self.live.read().as_ref().map(|live| live.generation)
	}

	/// Rebuilds the resource when its generation lags the slot's.
	///
	/// The replacement is built before anything is torn down; if the factory fails, the
	/// previous resource stays live and the failure lands in the slot's error cache for
	/// the next scheduler tick to retry.
	pub async fn rebuild_from(&self, slot: &CredentialSlot) -> Result<()> {
		let _serialized = self.rebuild_guard.lock().await;
		let generation = slot.generation();

		if self.live_generation() == Some(generation) {
			return Ok(());
		}

		let credential = match slot.get(Duration::ZERO) {
			Some(credential) => credential,
			None => {
				let error: Error =
					TransientError::Unavailable { slot: slot.name().to_string() }.into();

				slot.record_failure(&error);

				return Err(error);
			},
		};
		let built = match self.factory.build(&credential).await {
			Ok(resource) => resource,
			Err(error) => {
				slot.record_failure(&error);

				return Err(error);
			},
		};
		let previous = {
			let mut live = self.live.write();

			live.replace(LiveResource { resource: Arc::new(built), generation })
		};

		if let Some(previous) = previous {
			self.factory.close(previous.resource).await;
		}

		Ok(())
	}
}
impl<F> RebuildHook for ResourceBinding<F>
where
	F: ResourceFactory,
{
	fn rebuild<'a>(&'a self, slot: &'a CredentialSlot) -> RebuildFuture<'a> {
		Box::pin(self.rebuild_from(slot))
	}
}
impl<F> Debug for ResourceBinding<F>
where
	F: ResourceFactory,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceBinding")
			.field("live_generation", &self.live_generation())
			.finish()
	}
}
