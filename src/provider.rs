//! Acquisition strategies that produce fresh credentials.
//!
//! Every strategy satisfies one contract: produce one fresh [`Credential`] or fail with a
//! classified error. The static strategy re-validates a pre-provisioned secret, the
//! identity strategy exchanges a fixed scope against the external authority, and the
//! secret-store strategy re-fetches a named secret with a pseudo lifetime so reachability
//! is proven again each cycle. Acquisitions carry an explicit deadline; overrunning it is
//! a transient failure, never a fatal one.

pub mod identity;
pub mod secret_store;
pub mod static_secret;

pub use identity::IdentityExchangeProvider;
pub use secret_store::SecretStoreProvider;
pub use static_secret::StaticSecretProvider;

// self
use crate::{
	_prelude::*,
	cred::{Credential, Provenance},
};

/// Boxed future returned by [`CredentialProvider::acquire`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential>> + 'a + Send>>;

/// Capability to produce one fresh credential or fail.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Strategy tag stamped on produced credentials.
	fn provenance(&self) -> Provenance;

	/// Produces one fresh credential, observing `timeout` as a hard deadline.
	fn acquire(&self, timeout: Duration) -> AcquireFuture<'_>;
}

/// Converts a signed deadline into the unsigned form the runtime timer expects.
pub(crate) fn timer_deadline(timeout: Duration) -> std::time::Duration {
	std::time::Duration::try_from(timeout).unwrap_or(std::time::Duration::ZERO)
}
