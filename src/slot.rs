//! Purpose-scoped credential slots: one cache cell per credential stream.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, cred::Credential};

const SLOT_NAME_MAX_LEN: usize = 128;

/// Error returned when slot name validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SlotNameError {
	/// The name was empty.
	#[error("Slot name cannot be empty.")]
	Empty,
	/// The name contains whitespace characters.
	#[error("Slot name contains whitespace.")]
	ContainsWhitespace,
	/// The name exceeded the allowed character count.
	#[error("Slot name exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Purpose-scoped identifier for a credential slot (e.g. `blob-storage-access`).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotName(String);
impl SlotName {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SlotNameError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for SlotName {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for SlotName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<SlotName> for String {
	fn from(value: SlotName) -> Self {
		value.0
	}
}
impl TryFrom<String> for SlotName {
	type Error = SlotNameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for SlotName {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for SlotName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Slot({})", self.0)
	}
}
impl Display for SlotName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for SlotName {
	type Err = SlotNameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), SlotNameError> {
	if view.is_empty() {
		return Err(SlotNameError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(SlotNameError::ContainsWhitespace);
	}
	if view.len() > SLOT_NAME_MAX_LEN {
		return Err(SlotNameError::TooLong { max: SLOT_NAME_MAX_LEN });
	}

	Ok(())
}

/// Secret-free snapshot of a slot for health endpoints and diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
	/// Slot the snapshot belongs to.
	pub slot: SlotName,
	/// Whether a fresh, usable credential is cached.
	pub has_credential: bool,
	/// Remaining lifetime in whole seconds, floored at zero.
	pub ttl_seconds: u64,
	/// Expiry instant of the usable credential, absent after invalidation.
	pub expires_at: Option<OffsetDateTime>,
	/// Generation of the most recent successful refresh.
	pub generation: u64,
	/// Rendered message of the most recent failure, if one is cached.
	pub last_error: Option<String>,
	/// Instant of the most recent successful refresh.
	pub last_success_at: Option<OffsetDateTime>,
}

#[derive(Default)]
struct SlotState {
	credential: Option<Credential>,
	fresh: bool,
	generation: u64,
	last_error: Option<Error>,
	last_success_at: Option<OffsetDateTime>,
}

/// Thread-safe holder of one purpose's live credential.
///
/// The slot owns all of its mutable state behind a single mutex held only for
/// microsecond-scale transitions; acquisition I/O never happens under it. A monotonically
/// increasing generation counter is bumped on every successful [`set`](Self::set) so
/// rotation watchers compare generations, never secret values.
pub struct CredentialSlot {
	name: SlotName,
	state: Mutex<SlotState>,
}
impl CredentialSlot {
	/// Creates an empty slot at generation zero.
	pub fn new(name: SlotName) -> Self {
		Self { name, state: Mutex::new(SlotState::default()) }
	}

	/// Slot identifier.
	pub fn name(&self) -> &SlotName {
		&self.name
	}

	/// Returns the cached credential only if it is fresh and keeps strictly more than
	/// `min_ttl` of lifetime at `now`. Never triggers an acquisition.
	pub fn get_at(&self, min_ttl: Duration, now: OffsetDateTime) -> Option<Credential> {
		let state = self.state.lock();

		match &state.credential {
			Some(credential) if state.fresh && credential.satisfies_at(min_ttl, now) =>
				Some(credential.clone()),
			_ => None,
		}
	}

	/// [`get_at`](Self::get_at) against the current UTC clock.
	pub fn get(&self, min_ttl: Duration) -> Option<Credential> {
		self.get_at(min_ttl, OffsetDateTime::now_utc())
	}

	/// Last-resort read that ignores freshness and expiry entirely.
	pub fn get_stale(&self) -> Option<Credential> {
		self.state.lock().credential.clone()
	}

	/// Publishes a replacement credential at `now`: marks the slot fresh, increments the
	/// generation, stamps the success instant, and clears any cached failure. Returns the
	/// new generation.
	pub fn set_at(&self, credential: Credential, now: OffsetDateTime) -> u64 {
		let mut state = self.state.lock();

		state.credential = Some(credential);
		state.fresh = true;
		state.generation += 1;
		state.last_error = None;
		state.last_success_at = Some(now);

		state.generation
	}

	/// [`set_at`](Self::set_at) against the current UTC clock.
	pub fn set(&self, credential: Credential) -> u64 {
		self.set_at(credential, OffsetDateTime::now_utc())
	}

	/// Clears freshness only; the stale secret stays retrievable through
	/// [`get_stale`](Self::get_stale). Idempotent.
	pub fn invalidate(&self) {
		self.state.lock().fresh = false;
	}

	/// Generation of the most recent successful refresh; strictly increasing.
	pub fn generation(&self) -> u64 {
		self.state.lock().generation
	}

	/// Caches the most recent acquisition or rebuild failure for diagnostics.
	pub fn record_failure(&self, error: &Error) {
		self.state.lock().last_error = Some(error.clone());
	}

	/// Most recent cached failure, cleared by the next successful refresh.
	pub fn last_error(&self) -> Option<Error> {
		self.state.lock().last_error.clone()
	}

	/// Instant of the most recent successful refresh.
	pub fn last_success_at(&self) -> Option<OffsetDateTime> {
		self.state.lock().last_success_at
	}

	/// Secret-free snapshot at `now`.
	pub fn status_at(&self, now: OffsetDateTime) -> SlotStatus {
		let state = self.state.lock();
		let usable = if state.fresh { state.credential.as_ref() } else { None };
		let ttl_seconds = usable
			.map(|credential| credential.remaining_at(now).whole_seconds().max(0))
			.map(|seconds| u64::try_from(seconds).unwrap_or(0))
			.unwrap_or(0);

		SlotStatus {
			slot: self.name.clone(),
			has_credential: usable.is_some(),
			ttl_seconds,
			expires_at: usable.map(Credential::expires_at),
			generation: state.generation,
			last_error: state.last_error.as_ref().map(ToString::to_string),
			last_success_at: state.last_success_at,
		}
	}

	/// [`status_at`](Self::status_at) against the current UTC clock.
	pub fn status(&self) -> SlotStatus {
		self.status_at(OffsetDateTime::now_utc())
	}
}
impl Debug for CredentialSlot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("CredentialSlot")
			.field("name", &self.name)
			.field("has_credential", &state.credential.is_some())
			.field("fresh", &state.fresh)
			.field("generation", &state.generation)
			.finish()
	}
}
