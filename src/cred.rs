//! Credential value objects shared by slots, providers, and resource bindings.

pub mod secret;

pub use secret::SecretString;

// self
use crate::_prelude::*;

/// Strategy that produced a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
	/// Pre-provisioned secret read from configuration.
	StaticSecret,
	/// Token exchange against the external identity authority.
	IdentityExchange,
	/// Named lookup in the external secret store.
	SecretStore,
}
impl Provenance {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Provenance::StaticSecret => "static_secret",
			Provenance::IdentityExchange => "identity_exchange",
			Provenance::SecretStore => "secret_store",
		}
	}
}
impl Display for Provenance {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable credential paired with its absolute UTC expiry and provenance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	secret: SecretString,
	expires_at: OffsetDateTime,
	provenance: Provenance,
}
impl Credential {
	/// Builds a credential; the value never changes after issuance.
	pub fn new(secret: SecretString, expires_at: OffsetDateTime, provenance: Provenance) -> Self {
		Self { secret, expires_at, provenance }
	}

	/// Returns the secret material. Callers must avoid logging it.
	pub fn secret(&self) -> &SecretString {
		&self.secret
	}

	/// Absolute UTC instant after which the credential is invalid.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Strategy that produced this credential.
	pub fn provenance(&self) -> Provenance {
		self.provenance
	}

	/// Remaining lifetime at `now`; negative once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Whether strictly more than `min_ttl` of lifetime is left at `now`.
	pub fn satisfies_at(&self, min_ttl: Duration, now: OffsetDateTime) -> bool {
		self.remaining_at(now) > min_ttl
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("provenance", &self.provenance)
			.finish()
	}
}
