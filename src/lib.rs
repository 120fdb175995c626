//! Rust's turnkey credential lifecycle manager - single-flight refresh, proactive rotation, and
//! atomic dependent-resource swaps in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

// The `test` feature pulls in a self-dependency used only by the integration tests in `tests/`;
// silence `unused_crate_dependencies` when compiling the lib's own test target.
#[cfg(test)]
use token_steward as _;

pub mod config;
pub mod cred;
pub mod error;
pub mod gate;
pub mod obs;
pub mod provider;
pub mod remote;
pub mod resource;
pub mod scheduler;
pub mod slot;
pub mod steward;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicU64, Ordering},
		time::Duration as StdDuration,
	};
	// self
	use crate::{
		config::{ProviderSpec, SlotSpec},
		cred::SecretString,
		remote::{ExchangeFuture, IdentityAuthority, IssuedToken},
		slot::SlotName,
	};

	/// Scripted identity authority for unit and integration tests.
	///
	/// Each exchange observes the optional delay, then drains one queued failure if any
	/// remain, otherwise succeeds with a unique `token-{n}` secret and the configured
	/// lifetime.
	pub struct ScriptedAuthority {
		delay: StdDuration,
		lifetime: Duration,
		failures: Mutex<VecDeque<Error>>,
		calls: AtomicU64,
	}
	impl ScriptedAuthority {
		/// Creates an authority that always succeeds with the provided token lifetime.
		pub fn fresh(lifetime: Duration) -> Self {
			Self {
				delay: StdDuration::ZERO,
				lifetime,
				failures: Mutex::new(VecDeque::new()),
				calls: AtomicU64::new(0),
			}
		}

		/// Delays every exchange; useful for single-flight assertions.
		pub fn with_delay(mut self, delay: StdDuration) -> Self {
			self.delay = delay;

			self
		}

		/// Queues a failure that is returned before successful exchanges resume.
		pub fn queue_failure(&self, error: Error) {
			self.failures.lock().push_back(error);
		}

		/// Total number of exchange calls observed so far.
		pub fn calls(&self) -> u64 {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl IdentityAuthority for ScriptedAuthority {
		fn exchange<'a>(&'a self, _scope: &'a str) -> ExchangeFuture<'a> {
			Box::pin(async move {
				let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

				if !self.delay.is_zero() {
					tokio::time::sleep(self.delay).await;
				}
				if let Some(error) = self.failures.lock().pop_front() {
					return Err(error);
				}

				Ok(IssuedToken {
					secret: SecretString::new(format!("token-{call}")),
					expires_at: OffsetDateTime::now_utc() + self.lifetime,
				})
			})
		}
	}

	/// Builds a validated slot name fixture.
	pub fn slot_name(value: &str) -> SlotName {
		SlotName::new(value).expect("Slot name fixture should be valid.")
	}

	/// Builds an identity-exchange slot spec with test-friendly defaults.
	pub fn identity_slot_spec(name: &str) -> SlotSpec {
		SlotSpec::new(
			slot_name(name),
			ProviderSpec::IdentityExchange { scope: "https://example.test/.default".into() },
		)
	}
}

mod _prelude {
	pub use std::{
		collections::{HashMap, hash_map::DefaultHasher},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
