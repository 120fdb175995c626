//! Steward-level error types shared across slots, providers, and the scheduler.

// self
use crate::_prelude::*;

/// Steward-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical steward error exposed by public APIs.
///
/// Every variant is cloneable so the single-flight gate can hand one outcome to every
/// caller that waited on it and slots can cache the most recent failure for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal for the slot and never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retried on the normal refresh cadence.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Backend denied access; retried on cadence since permissions can be granted without a
	/// restart, but surfaced loudly because remediation usually needs a human.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),
}
impl Error {
	/// Returns `true` when retrying on the normal refresh cadence can succeed.
	pub const fn is_retryable(&self) -> bool {
		!matches!(self, Self::Config(_))
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn kind_label(&self) -> &'static str {
		match self {
			Self::Config(_) => "config",
			Self::Transient(_) => "transient",
			Self::Authorization(_) => "authorization",
		}
	}
}

/// Configuration and validation failures surfaced at startup, never on the request path.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// A slot referenced a parameter that was never provided.
	#[error("Slot `{slot}` is missing required parameter `{parameter}`.")]
	MissingParameter {
		/// Slot the parameter belongs to.
		slot: String,
		/// Name of the missing parameter.
		parameter: &'static str,
	},
	/// An identity-exchange slot was registered without an identity authority.
	#[error("No identity authority is registered for identity-exchange slots.")]
	MissingAuthority,
	/// A secret-store slot was registered without a secret store.
	#[error("No secret store is registered for secret-store lookup slots.")]
	MissingSecretStore,
	/// The requested slot name is not part of the steward's registry.
	#[error("Slot `{slot}` is not registered.")]
	UnknownSlot {
		/// Name the caller asked for.
		slot: String,
	},
	/// Two slot specs share the same name.
	#[error("Slot `{slot}` is registered more than once.")]
	DuplicateSlot {
		/// Name that collided.
		slot: String,
	},
	/// A configuration payload failed to deserialize.
	#[error("Configuration payload is invalid at `{path}`: {message}.")]
	InvalidPayload {
		/// Path of the failing element inside the payload.
		path: String,
		/// Underlying deserialization failure.
		message: String,
	},
	/// Slot name validation failed.
	#[error(transparent)]
	InvalidSlotName(#[from] crate::slot::SlotNameError),
	/// An endpoint URL could not be parsed.
	#[error("Endpoint URL is invalid: {message}.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		message: String,
	},
}

/// Temporary failure variants (safe to retry on the refresh cadence).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TransientError {
	/// Credential endpoint returned an unexpected but non-fatal response.
	#[error("Credential endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Upstream-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Credential endpoint responded with malformed JSON.
	#[error("Credential endpoint returned malformed JSON at `{path}`: {message}.")]
	ResponseParse {
		/// Path of the failing element inside the payload.
		path: String,
		/// Underlying parsing failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Underlying transport reported a network failure.
	#[error("Network error occurred while calling the credential endpoint: {message}.")]
	Network {
		/// Transport-specific failure description.
		message: String,
	},
	/// The acquisition deadline elapsed before the backend answered.
	#[error("Credential acquisition timed out after {timeout}.")]
	Timeout {
		/// Deadline that was exceeded.
		timeout: Duration,
	},
	/// No usable credential is cached for an operation that requires one.
	#[error("Slot `{slot}` holds no usable credential.")]
	Unavailable {
		/// Slot that came up empty.
		slot: String,
	},
}

/// Permission failures reported by a backend; remediation happens outside the process.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorizationError {
	/// The backend rejected the caller's identity or role assignment.
	#[error("Credential endpoint denied access: {message}.")]
	Denied {
		/// Upstream-supplied reason, verbatim, so operators can remediate.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The named secret does not exist or is not readable.
	#[error("Secret `{name}` is unavailable in the secret store: {message}.")]
	SecretUnavailable {
		/// Secret name that was requested.
		name: String,
		/// Upstream-supplied reason, verbatim.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retryability_follows_the_taxonomy() {
		let config: Error = ConfigError::MissingAuthority.into();
		let transient: Error = TransientError::Network { message: "connection reset".into() }.into();
		let authorization: Error =
			AuthorizationError::Denied { message: "missing role assignment".into(), status: Some(403) }
				.into();

		assert!(!config.is_retryable());
		assert!(transient.is_retryable());
		assert!(authorization.is_retryable());
	}

	#[test]
	fn kind_labels_are_stable() {
		let transient: Error = TransientError::Timeout { timeout: Duration::seconds(10) }.into();

		assert_eq!(transient.kind_label(), "transient");
		assert_eq!(Error::from(ConfigError::MissingSecretStore).kind_label(), "config");
	}

	#[test]
	fn messages_surface_the_upstream_cause() {
		let error: Error = AuthorizationError::Denied {
			message: "AADSTS50105: assignment missing".into(),
			status: Some(403),
		}
		.into();

		assert!(error.to_string().contains("AADSTS50105"));
	}
}
