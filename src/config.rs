//! Immutable per-slot configuration evaluated once at startup.

// self
use crate::{_prelude::*, cred::SecretString, error::ConfigError, slot::SlotName};

/// Default minimum remaining lifetime below which a cached credential is due for renewal.
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 300;
/// Default deadline for one provider acquisition.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
/// Default pseudo lifetime stamped on secret-store lookups, which carry no natural expiry.
pub const DEFAULT_PSEUDO_TTL_SECS: u64 = 3_600;

/// Acquisition strategy for a slot; one closed variant per strategy so adding or removing
/// one is a compile-time-checked change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ProviderSpec {
	/// Pre-provisioned secret read once from configuration.
	Static {
		/// Secret material; redacted in debug output.
		secret: SecretString,
	},
	/// Token exchange against the identity authority with a fixed scope/audience.
	IdentityExchange {
		/// Scope or audience string forwarded verbatim to the authority.
		scope: String,
	},
	/// Named lookup in the external secret store.
	SecretStoreLookup {
		/// Secret name passed to the store.
		secret_name: String,
	},
}

/// Behavior when an acquisition fails and a stale secret is still cached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
	/// Surface the failure to the caller immediately.
	#[default]
	FailFast,
	/// Serve the stale secret as a last resort and let the backend be the judge.
	ServeStale,
}

/// Immutable configuration for one credential slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
	/// Slot identifier; unique within a steward.
	pub name: SlotName,
	/// Acquisition strategy.
	pub provider: ProviderSpec,
	/// Minimum remaining lifetime (seconds) below which the cached value is due for renewal.
	#[serde(default = "default_refresh_buffer_secs")]
	pub refresh_buffer_secs: u64,
	/// Deadline (seconds) for one provider acquisition.
	#[serde(default = "default_acquire_timeout_secs")]
	pub acquire_timeout_secs: u64,
	/// Pseudo lifetime (seconds) stamped on secret-store lookups.
	#[serde(default = "default_pseudo_ttl_secs")]
	pub pseudo_ttl_secs: u64,
	/// Behavior when acquisition fails and a stale secret is still cached.
	#[serde(default)]
	pub fallback: FallbackPolicy,
	/// Whether readiness probes require this slot to hold a usable credential.
	#[serde(default = "default_required")]
	pub required: bool,
}
impl SlotSpec {
	/// Creates a spec with the crate defaults.
	pub fn new(name: SlotName, provider: ProviderSpec) -> Self {
		Self {
			name,
			provider,
			refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
			acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
			pseudo_ttl_secs: DEFAULT_PSEUDO_TTL_SECS,
			fallback: FallbackPolicy::default(),
			required: true,
		}
	}

	/// Overrides the refresh buffer.
	pub fn with_refresh_buffer_secs(mut self, secs: u64) -> Self {
		self.refresh_buffer_secs = secs;

		self
	}

	/// Overrides the acquisition deadline.
	pub fn with_acquire_timeout_secs(mut self, secs: u64) -> Self {
		self.acquire_timeout_secs = secs;

		self
	}

	/// Overrides the pseudo lifetime for secret-store lookups.
	pub fn with_pseudo_ttl_secs(mut self, secs: u64) -> Self {
		self.pseudo_ttl_secs = secs;

		self
	}

	/// Overrides the fallback policy.
	pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
		self.fallback = fallback;

		self
	}

	/// Excludes the slot from readiness probes.
	pub fn optional_for_readiness(mut self) -> Self {
		self.required = false;

		self
	}

	/// Refresh buffer as a duration.
	pub fn refresh_buffer(&self) -> Duration {
		seconds(self.refresh_buffer_secs)
	}

	/// Acquisition deadline as a duration.
	pub fn acquire_timeout(&self) -> Duration {
		seconds(self.acquire_timeout_secs)
	}

	/// Pseudo lifetime as a duration.
	pub fn pseudo_ttl(&self) -> Duration {
		seconds(self.pseudo_ttl_secs)
	}

	/// Validates that every parameter the chosen strategy requires is present.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let missing = match &self.provider {
			ProviderSpec::Static { secret } if secret.expose().trim().is_empty() => Some("secret"),
			ProviderSpec::IdentityExchange { scope } if scope.trim().is_empty() => Some("scope"),
			ProviderSpec::SecretStoreLookup { secret_name } if secret_name.trim().is_empty() =>
				Some("secret_name"),
			_ => None,
		};

		match missing {
			Some(parameter) =>
				Err(ConfigError::MissingParameter { slot: self.name.to_string(), parameter }),
			None => Ok(()),
		}
	}
}

/// Deserializes a slot list from a JSON payload, reporting the failing path on malformed
/// input.
pub fn slots_from_json(payload: &[u8]) -> Result<Vec<SlotSpec>, ConfigError> {
	let mut deserializer = serde_json::Deserializer::from_slice(payload);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|err| ConfigError::InvalidPayload {
		path: err.path().to_string(),
		message: err.inner().to_string(),
	})
}

fn seconds(secs: u64) -> Duration {
	Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

fn default_refresh_buffer_secs() -> u64 {
	DEFAULT_REFRESH_BUFFER_SECS
}

fn default_acquire_timeout_secs() -> u64 {
	DEFAULT_ACQUIRE_TIMEOUT_SECS
}

fn default_pseudo_ttl_secs() -> u64 {
	DEFAULT_PSEUDO_TTL_SECS
}

fn default_required() -> bool {
	true
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_payloads_fill_in_defaults() {
		let payload = br#"[
			{ "name": "blob-storage-access", "provider": { "strategy": "identity_exchange", "scope": "https://storage.example/.default" } },
			{ "name": "database-access", "provider": { "strategy": "secret_store_lookup", "secret_name": "db-password" }, "pseudo_ttl_secs": 900, "required": false }
		]"#;
		let specs = slots_from_json(payload).expect("Valid payload should deserialize.");

		assert_eq!(specs.len(), 2);
		assert_eq!(specs[0].refresh_buffer_secs, DEFAULT_REFRESH_BUFFER_SECS);
		assert_eq!(specs[0].fallback, FallbackPolicy::FailFast);
		assert!(specs[0].required);
		assert_eq!(specs[1].pseudo_ttl_secs, 900);
		assert!(!specs[1].required);
	}

	#[test]
	fn malformed_payloads_report_the_failing_path() {
		let payload = br#"[ { "name": "db", "provider": { "strategy": "identity_exchange" } } ]"#;
		let error = slots_from_json(payload).expect_err("Missing scope should be rejected.");

		match error {
			ConfigError::InvalidPayload { path, .. } => assert!(path.contains('0')),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn validate_rejects_blank_strategy_parameters() {
		let name = SlotName::new("db").expect("Slot name fixture should be valid.");
		let spec =
			SlotSpec::new(name.clone(), ProviderSpec::IdentityExchange { scope: "  ".into() });

		assert_eq!(
			spec.validate(),
			Err(ConfigError::MissingParameter { slot: "db".into(), parameter: "scope" }),
		);

		let spec = SlotSpec::new(name, ProviderSpec::SecretStoreLookup { secret_name: "".into() });

		assert_eq!(
			spec.validate(),
			Err(ConfigError::MissingParameter { slot: "db".into(), parameter: "secret_name" }),
		);
	}
}
