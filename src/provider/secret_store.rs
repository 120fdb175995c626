//! Secret-store lookup strategy.

// self
use crate::{
	_prelude::*,
	cred::{Credential, Provenance},
	error::TransientError,
	provider::{self, AcquireFuture, CredentialProvider},
	remote::SecretStore,
};

/// Strategy that re-fetches a named secret from the external store.
///
/// Stored secrets carry no natural expiry, so each fetch is stamped with a configurable
/// pseudo lifetime. That forces periodic re-validation that the secret still exists and
/// the store is reachable, even when the value itself never changes.
pub struct SecretStoreProvider {
	store: Arc<dyn SecretStore>,
	secret_name: String,
	pseudo_ttl: Duration,
}
impl SecretStoreProvider {
	/// Creates a provider bound to one named secret.
	pub fn new(store: Arc<dyn SecretStore>, secret_name: impl Into<String>, pseudo_ttl: Duration) -> Self {
		Self { store, secret_name: secret_name.into(), pseudo_ttl }
	}
}
impl CredentialProvider for SecretStoreProvider {
	fn provenance(&self) -> Provenance {
		Provenance::SecretStore
	}

	fn acquire(&self, timeout: Duration) -> AcquireFuture<'_> {
		Box::pin(async move {
			let fetch = self.store.fetch(&self.secret_name);
			let secret = tokio::time::timeout(provider::timer_deadline(timeout), fetch)
				.await
				.map_err(|_| Error::from(TransientError::Timeout { timeout }))??;

			Ok(Credential::new(
				secret,
				OffsetDateTime::now_utc() + self.pseudo_ttl,
				Provenance::SecretStore,
			))
		})
	}
}
impl Debug for SecretStoreProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecretStoreProvider")
			.field("secret_name", &self.secret_name)
			.field("pseudo_ttl", &self.pseudo_ttl)
			.finish()
	}
}
