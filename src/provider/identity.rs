//! Identity-authority token exchange strategy.

// self
use crate::{
	_prelude::*,
	cred::{Credential, Provenance},
	error::TransientError,
	provider::{self, AcquireFuture, CredentialProvider},
	remote::IdentityAuthority,
};

/// Strategy that exchanges a fixed scope/audience for a short-lived token.
///
/// Authority failures pass through unshortened; operators need the underlying cause
/// (e.g. a missing role assignment) to remediate.
pub struct IdentityExchangeProvider {
	authority: Arc<dyn IdentityAuthority>,
	scope: String,
}
impl IdentityExchangeProvider {
	/// Creates a provider bound to one scope/audience string.
	pub fn new(authority: Arc<dyn IdentityAuthority>, scope: impl Into<String>) -> Self {
		Self { authority, scope: scope.into() }
	}
}
impl CredentialProvider for IdentityExchangeProvider {
	fn provenance(&self) -> Provenance {
		Provenance::IdentityExchange
	}

	fn acquire(&self, timeout: Duration) -> AcquireFuture<'_> {
		Box::pin(async move {
			let exchange = self.authority.exchange(&self.scope);
			let issued = tokio::time::timeout(provider::timer_deadline(timeout), exchange)
				.await
				.map_err(|_| Error::from(TransientError::Timeout { timeout }))??;

			Ok(Credential::new(issued.secret, issued.expires_at, Provenance::IdentityExchange))
		})
	}
}
impl Debug for IdentityExchangeProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityExchangeProvider").field("scope", &self.scope).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::ScriptedAuthority, remote::ExchangeFuture};

	struct StalledAuthority;
	impl IdentityAuthority for StalledAuthority {
		fn exchange<'a>(&'a self, _scope: &'a str) -> ExchangeFuture<'a> {
			Box::pin(async {
				// The deadline fires long before this resolves.
				tokio::time::sleep(std::time::Duration::from_secs(3_600)).await;

				Err(TransientError::Network { message: "stalled".into() }.into())
			})
		}
	}

	#[tokio::test]
	async fn exchanges_carry_the_authority_expiry() {
		let authority = Arc::new(ScriptedAuthority::fresh(Duration::hours(1)));
		let provider = IdentityExchangeProvider::new(authority.clone(), "https://maps.example/.default");
		let credential = provider
			.acquire(Duration::seconds(10))
			.await
			.expect("Scripted exchange should succeed.");

		assert_eq!(credential.provenance(), Provenance::IdentityExchange);
		assert!(credential.satisfies_at(Duration::minutes(55), OffsetDateTime::now_utc()));
		assert_eq!(authority.calls(), 1);
	}

	#[tokio::test]
	async fn overrunning_the_deadline_is_transient() {
		let provider =
			IdentityExchangeProvider::new(Arc::new(StalledAuthority), "https://maps.example/.default");
		let error = provider
			.acquire(Duration::milliseconds(50))
			.await
			.expect_err("A stalled authority must time out.");

		assert_eq!(
			error,
			Error::from(TransientError::Timeout { timeout: Duration::milliseconds(50) }),
		);
	}

	#[tokio::test]
	async fn authority_failures_pass_through() {
		let authority = Arc::new(ScriptedAuthority::fresh(Duration::hours(1)));

		authority.queue_failure(
			crate::error::AuthorizationError::Denied {
				message: "missing role assignment".into(),
				status: Some(403),
			}
			.into(),
		);

		let provider = IdentityExchangeProvider::new(authority, "https://maps.example/.default");
		let error = provider
			.acquire(Duration::seconds(10))
			.await
			.expect_err("Queued failure should surface.");

		assert!(error.to_string().contains("missing role assignment"));
	}
}
