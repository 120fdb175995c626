//! Pre-provisioned static secret strategy.

// self
use crate::{
	_prelude::*,
	cred::{Credential, Provenance, SecretString},
	error::ConfigError,
	provider::{AcquireFuture, CredentialProvider},
	slot::SlotName,
};

// Far enough out that TTL arithmetic behaves uniformly across strategies.
const STATIC_LIFETIME: Duration = Duration::days(36_500);

/// Strategy that re-validates a pre-provisioned secret on every refresh.
///
/// "Refresh" extends no real expiry; a far-future one is stamped so the slot's TTL logic
/// works the same as for rotating strategies.
#[derive(Clone, Debug)]
pub struct StaticSecretProvider {
	secret: SecretString,
}
impl StaticSecretProvider {
	/// Validates presence of the secret and builds the provider.
	pub fn new(slot: &SlotName, secret: SecretString) -> Result<Self, ConfigError> {
		if secret.expose().trim().is_empty() {
			return Err(ConfigError::MissingParameter {
				slot: slot.to_string(),
				parameter: "secret",
			});
		}

		Ok(Self { secret })
	}
}
impl CredentialProvider for StaticSecretProvider {
	fn provenance(&self) -> Provenance {
		Provenance::StaticSecret
	}

	fn acquire(&self, _timeout: Duration) -> AcquireFuture<'_> {
		let credential = Credential::new(
			self.secret.clone(),
			OffsetDateTime::now_utc() + STATIC_LIFETIME,
			Provenance::StaticSecret,
		);

		Box::pin(async move { Ok(credential) })
	}
}
