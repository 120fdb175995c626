//! Composition-root object owning every credential slot.
//!
//! One [`Steward`] is built at process start and passed by reference to everything that
//! needs credentials; there is no ambient global instance. A request-path read returns
//! the cached credential immediately when it is fresh enough, and otherwise funnels
//! through the slot's single-flight gate to the provider, so an empty or stale slot
//! costs the backend exactly one acquisition no matter how many callers observe the miss
//! simultaneously.

mod metrics;

pub use metrics::RotationMetrics;

// self
use crate::{
	_prelude::*,
	config::{FallbackPolicy, ProviderSpec, SlotSpec},
	cred::Credential,
	error::{ConfigError, TransientError},
	gate::RefreshGate,
	obs::{self, RefreshOutcome, RefreshReason, RefreshSpan},
	provider::{
		CredentialProvider, IdentityExchangeProvider, SecretStoreProvider, StaticSecretProvider,
	},
	remote::{IdentityAuthority, SecretStore},
	resource::RebuildHook,
	slot::{CredentialSlot, SlotName, SlotStatus},
};

struct ManagedSlot {
	slot: CredentialSlot,
	provider: Arc<dyn CredentialProvider>,
	gate: RefreshGate,
	bindings: RwLock<Vec<Arc<dyn RebuildHook>>>,
	refresh_buffer: Duration,
	acquire_timeout: Duration,
	fallback: FallbackPolicy,
	required: bool,
}
impl ManagedSlot {
	/// Preemptive window applied on the request path: the configured buffer minus a
	/// deterministic per-slot jitter so a fleet of slots does not renew in lockstep.
	fn effective_buffer(&self) -> Duration {
		let window_secs = self.refresh_buffer.whole_seconds();

		if window_secs <= 1 {
			return self.refresh_buffer;
		}

		let modulus = u64::try_from(window_secs).unwrap_or(u64::MAX);
		let jitter_secs = self.jitter_seed() % modulus;
		let clamped = i64::try_from(jitter_secs).unwrap_or(i64::MAX);

		self.refresh_buffer - Duration::seconds(clamped)
	}

	fn jitter_seed(&self) -> u64 {
		let mut hasher = DefaultHasher::new();

		self.slot.name().hash(&mut hasher);

		hasher.finish()
	}
}

/// Owns every slot and coordinates cache reads, single-flight refreshes, and resource
/// rebuilds.
pub struct Steward {
	slots: HashMap<SlotName, Arc<ManagedSlot>>,
	metrics: Arc<RotationMetrics>,
}
impl Steward {
	/// Starts an empty builder.
	pub fn builder() -> StewardBuilder {
		StewardBuilder::default()
	}

	fn managed(&self, name: &SlotName) -> Result<&Arc<ManagedSlot>, ConfigError> {
		self.slots.get(name).ok_or_else(|| ConfigError::UnknownSlot { slot: name.to_string() })
	}

	/// Registered slot names; the scheduler iterates these each tick.
	pub fn slot_names(&self) -> Vec<SlotName> {
		self.slots.keys().cloned().collect()
	}

	/// Rotation counters shared with diagnostics endpoints.
	pub fn metrics(&self) -> Arc<RotationMetrics> {
		self.metrics.clone()
	}

	/// Request-path read: a cache hit returns immediately; a miss funnels through the
	/// single-flight gate to the provider.
	///
	/// The effective freshness floor is the larger of `min_ttl` and the slot's jittered
	/// refresh buffer. When the freshly acquired credential still cannot satisfy
	/// `min_ttl` (the caller requires more headroom than the issuer ever grants), the
	/// call fails fast instead of looping. On acquisition failure the slot's fallback
	/// policy decides between surfacing the error and serving the stale secret.
	pub async fn get_credential(&self, name: &SlotName, min_ttl: Duration) -> Result<Credential> {
		let managed = self.managed(name)?;
		let wanted = min_ttl.max(managed.effective_buffer());

		if let Some(credential) = managed.slot.get(wanted) {
			return Ok(credential);
		}

		match self.refresh_managed(managed, RefreshReason::RequestMiss, wanted).await {
			Ok(credential) =>
				if credential.satisfies_at(min_ttl, OffsetDateTime::now_utc()) {
					Ok(credential)
				} else {
					Err(TransientError::Unavailable { slot: name.to_string() }.into())
				},
			Err(error) => match managed.fallback {
				FallbackPolicy::FailFast => Err(error),
				FallbackPolicy::ServeStale => managed.slot.get_stale().ok_or(error),
			},
		}
	}

	/// Forces an immediate refresh regardless of the cached TTL; used by operational
	/// triggers.
	pub async fn force_refresh(&self, name: &SlotName) -> Result<Credential> {
		let managed = self.managed(name)?;

		self.refresh_managed(managed, RefreshReason::Manual, Duration::ZERO).await
	}

	/// Proactive refresh on behalf of the scheduler; bypasses every freshness check.
	pub async fn refresh_slot(&self, name: &SlotName, reason: RefreshReason) -> Result<Credential> {
		let managed = self.managed(name)?;

		self.refresh_managed(managed, reason, Duration::ZERO).await
	}

	async fn refresh_managed(
		&self,
		managed: &Arc<ManagedSlot>,
		reason: RefreshReason,
		min_ttl: Duration,
	) -> Result<Credential> {
		let span = RefreshSpan::new(managed.slot.name(), reason, "refresh");

		obs::record_refresh_outcome(reason, RefreshOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span
			.instrument(async move {
				managed
					.gate
					.run(|| async {
						// A follower promoted to leader may find the cache already fresh;
						// scheduled and manual refreshes always go through to stay ahead
						// of expiry.
						let cached = match reason {
							RefreshReason::RequestMiss => managed.slot.get(min_ttl),
							_ => None,
						};

						if let Some(credential) = cached {
							return Ok(credential);
						}

						match managed.provider.acquire(managed.acquire_timeout).await {
							Ok(credential) => {
								managed.slot.set(credential.clone());

								Ok(credential)
							},
							Err(error) => {
								managed.slot.record_failure(&error);

								Err(error)
							},
						}
					})
					.await
			})
			.await;

		match &result {
			Ok(_) => {
				obs::record_refresh_outcome(reason, RefreshOutcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_refresh_outcome(reason, RefreshOutcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}

	/// Force-invalidates the slot's freshness; the next read misses and refreshes.
	pub fn invalidate(&self, name: &SlotName) -> Result<(), ConfigError> {
		self.managed(name)?.slot.invalidate();

		Ok(())
	}

	/// Secret-free status snapshot for health endpoints.
	pub fn status(&self, name: &SlotName) -> Result<SlotStatus, ConfigError> {
		Ok(self.managed(name)?.slot.status())
	}

	/// Most recent acquisition or rebuild failure for the slot.
	pub fn last_error(&self, name: &SlotName) -> Result<Option<Error>, ConfigError> {
		Ok(self.managed(name)?.slot.last_error())
	}

	/// Instant of the slot's most recent successful refresh.
	pub fn last_success_at(&self, name: &SlotName) -> Result<Option<OffsetDateTime>, ConfigError> {
		Ok(self.managed(name)?.slot.last_success_at())
	}

	/// Readiness at `now`: every required slot holds a credential with at least `margin`
	/// of lifetime left. Liveness must never be wired to this.
	pub fn ready_at(&self, margin: Duration, now: OffsetDateTime) -> bool {
		self.slots
			.values()
			.filter(|managed| managed.required)
			.all(|managed| managed.slot.get_at(margin, now).is_some())
	}

	/// [`ready_at`](Self::ready_at) against the current UTC clock.
	pub fn is_ready(&self, margin: Duration) -> bool {
		self.ready_at(margin, OffsetDateTime::now_utc())
	}

	/// Binds a dependent resource to the slot; it is rebuilt after every rotation.
	pub fn bind(&self, name: &SlotName, hook: Arc<dyn RebuildHook>) -> Result<(), ConfigError> {
		self.managed(name)?.bindings.write().push(hook);

		Ok(())
	}

	/// Rebuilds every resource bound to the slot whose generation lags.
	///
	/// All bindings are attempted even when one fails; the last failure is returned so
	/// the scheduler can log it, and each failure is already cached on the slot.
	pub async fn rebuild_bindings(&self, name: &SlotName) -> Result<()> {
		let managed = self.managed(name)?;
		let hooks: Vec<_> = managed.bindings.read().clone();
		let mut failure = None;

		for hook in hooks {
			self.metrics.record_rebuild_attempt();

			if let Err(error) = hook.rebuild(&managed.slot).await {
				self.metrics.record_rebuild_failure();
				failure = Some(error);
			}
		}

		match failure {
			Some(error) => Err(error),
			None => Ok(()),
		}
	}
}
impl Debug for Steward {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Steward").field("slots", &self.slot_names()).finish()
	}
}

/// Builder wiring slot specs to their runtime collaborators.
#[derive(Default)]
pub struct StewardBuilder {
	specs: Vec<SlotSpec>,
	authority: Option<Arc<dyn IdentityAuthority>>,
	secret_store: Option<Arc<dyn SecretStore>>,
}
impl StewardBuilder {
	/// Registers the identity authority used by identity-exchange slots.
	pub fn with_authority(mut self, authority: Arc<dyn IdentityAuthority>) -> Self {
		self.authority = Some(authority);

		self
	}

	/// Registers the secret store used by secret-store lookup slots.
	pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
		self.secret_store = Some(store);

		self
	}

	/// Adds one slot spec.
	pub fn slot(mut self, spec: SlotSpec) -> Self {
		self.specs.push(spec);

		self
	}

	/// Adds many slot specs.
	pub fn slots(mut self, specs: impl IntoIterator<Item = SlotSpec>) -> Self {
		self.specs.extend(specs);

		self
	}

	/// Validates every spec and builds the steward.
	///
	/// Configuration problems surface here, at startup, never on the request path.
	pub fn build(self) -> Result<Steward, ConfigError> {
		let mut slots = HashMap::with_capacity(self.specs.len());

		for spec in self.specs {
			spec.validate()?;

			let provider: Arc<dyn CredentialProvider> = match &spec.provider {
				ProviderSpec::Static { secret } =>
					Arc::new(StaticSecretProvider::new(&spec.name, secret.clone())?),
				ProviderSpec::IdentityExchange { scope } => {
					let authority =
						self.authority.clone().ok_or(ConfigError::MissingAuthority)?;

					Arc::new(IdentityExchangeProvider::new(authority, scope.clone()))
				},
				ProviderSpec::SecretStoreLookup { secret_name } => {
					let store =
						self.secret_store.clone().ok_or(ConfigError::MissingSecretStore)?;

					Arc::new(SecretStoreProvider::new(store, secret_name.clone(), spec.pseudo_ttl()))
				},
			};
			let managed = ManagedSlot {
				slot: CredentialSlot::new(spec.name.clone()),
				provider,
				gate: RefreshGate::new(),
				bindings: RwLock::new(Vec::new()),
				refresh_buffer: spec.refresh_buffer(),
				acquire_timeout: spec.acquire_timeout(),
				fallback: spec.fallback,
				required: spec.required,
			};

			if slots.insert(spec.name.clone(), Arc::new(managed)).is_some() {
				return Err(ConfigError::DuplicateSlot { slot: spec.name.to_string() });
			}
		}

		Ok(Steward { slots, metrics: Arc::default() })
	}
}
