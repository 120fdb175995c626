//! External collaborator boundaries: the identity authority and the secret store.
//!
//! The steward never issues credentials itself; it reaches the two external systems
//! through narrow traits so deployments can plug in their own transports. The
//! reqwest-backed implementations cover the common HTTPS case: a form-encoded token
//! exchange and a named secret lookup, with status codes mapped onto the steward error
//! taxonomy and Retry-After hints preserved for backoff decisions.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, cred::SecretString};
#[cfg(feature = "reqwest")]
use crate::error::{AuthorizationError, ConfigError, TransientError};

/// Token material returned by an identity authority exchange.
#[derive(Clone, Debug)]
pub struct IssuedToken {
	/// Bearer secret granted by the authority.
	pub secret: SecretString,
	/// Absolute UTC expiry reported by the authority.
	pub expires_at: OffsetDateTime,
}

/// Boxed future returned by [`IdentityAuthority::exchange`].
pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<IssuedToken>> + 'a + Send>>;

/// External authority that exchanges a scope/audience for a short-lived token.
pub trait IdentityAuthority
where
	Self: Send + Sync,
{
	/// Performs one token exchange for `scope`.
	///
	/// Implementations surface the authority's own error text verbatim inside the
	/// returned error so operators can see the underlying cause (e.g. a missing role
	/// assignment).
	fn exchange<'a>(&'a self, scope: &'a str) -> ExchangeFuture<'a>;
}

/// Boxed future returned by [`SecretStore::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<SecretString>> + 'a + Send>>;

/// External store resolving named secrets.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Fetches the named secret.
	fn fetch<'a>(&'a self, name: &'a str) -> FetchFuture<'a>;
}

#[cfg(feature = "reqwest")]
/// Identity authority reached over HTTPS with a form-encoded exchange request.
#[derive(Clone, Debug)]
pub struct ReqwestIdentityAuthority {
	client: ReqwestClient,
	token_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestIdentityAuthority {
	/// Builds an authority client for the provided token endpoint.
	pub fn new(token_url: impl AsRef<str>) -> Result<Self, ConfigError> {
		let token_url = Url::parse(token_url.as_ref())
			.map_err(|err| ConfigError::InvalidEndpoint { message: err.to_string() })?;

		Ok(Self::with_client(ReqwestClient::default(), token_url))
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, token_url: Url) -> Self {
		Self { client, token_url }
	}
}
#[cfg(feature = "reqwest")]
impl IdentityAuthority for ReqwestIdentityAuthority {
	fn exchange<'a>(&'a self, scope: &'a str) -> ExchangeFuture<'a> {
		Box::pin(async move {
			let response = self
				.client
				.post(self.token_url.clone())
				.form(&[("scope", scope)])
				.send()
				.await
				.map_err(network_error)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(network_error)?;

			if !(200..300).contains(&status) {
				return Err(classify_failure(status, retry_after, &body));
			}

			let payload: TokenEndpointResponse = parse_json(&body, Some(status))?;
			let expires_at = payload.expires_at(OffsetDateTime::now_utc(), status)?;

			Ok(IssuedToken { secret: SecretString::new(payload.access_token), expires_at })
		})
	}
}

#[cfg(feature = "reqwest")]
/// Secret store reached over HTTPS with per-secret GET lookups.
#[derive(Clone, Debug)]
pub struct ReqwestSecretStore {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestSecretStore {
	/// Builds a store client for the provided base endpoint.
	pub fn new(base_url: impl AsRef<str>) -> Result<Self, ConfigError> {
		let base_url = Url::parse(base_url.as_ref())
			.map_err(|err| ConfigError::InvalidEndpoint { message: err.to_string() })?;

		Ok(Self::with_client(ReqwestClient::default(), base_url))
	}

	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	fn secret_url(&self, name: &str) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|()| ConfigError::InvalidEndpoint {
				message: "base URL cannot carry path segments".into(),
			})?
			.push("secrets")
			.push(name);

		Ok(url)
	}
}
#[cfg(feature = "reqwest")]
impl SecretStore for ReqwestSecretStore {
	fn fetch<'a>(&'a self, name: &'a str) -> FetchFuture<'a> {
		Box::pin(async move {
			let url = self.secret_url(name)?;
			let response = self.client.get(url).send().await.map_err(network_error)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(network_error)?;

			if status == 404 {
				return Err(AuthorizationError::SecretUnavailable {
					name: name.to_owned(),
					message: body_message(status, &body),
				}
				.into());
			}
			if !(200..300).contains(&status) {
				return Err(classify_failure(status, retry_after, &body));
			}

			let payload: SecretPayload = parse_json(&body, Some(status))?;

			Ok(SecretString::new(payload.value))
		})
	}
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	expires_on: Option<i64>,
}
#[cfg(feature = "reqwest")]
impl TokenEndpointResponse {
	fn expires_at(&self, now: OffsetDateTime, status: u16) -> Result<OffsetDateTime> {
		if let Some(timestamp) = self.expires_on {
			return OffsetDateTime::from_unix_timestamp(timestamp).map_err(|err| {
				TransientError::Endpoint {
					message: format!("expires_on is out of range: {err}"),
					status: Some(status),
					retry_after: None,
				}
				.into()
			});
		}

		match self.expires_in {
			Some(seconds) if seconds > 0 => Ok(now + Duration::seconds(seconds)),
			Some(_) => Err(TransientError::Endpoint {
				message: "expires_in must be positive".into(),
				status: Some(status),
				retry_after: None,
			}
			.into()),
			None => Err(TransientError::Endpoint {
				message: "token response carried no expiry".into(),
				status: Some(status),
				retry_after: None,
			}
			.into()),
		}
	}
}

#[cfg(feature = "reqwest")]
#[derive(Debug, Deserialize)]
struct SecretPayload {
	value: String,
}

#[cfg(feature = "reqwest")]
fn network_error(err: ReqwestError) -> Error {
	TransientError::Network { message: err.to_string() }.into()
}

#[cfg(feature = "reqwest")]
fn body_message(status: u16, body: &[u8]) -> String {
	let message = String::from_utf8_lossy(body).trim().to_owned();

	if message.is_empty() { format!("HTTP {status}") } else { message }
}

#[cfg(feature = "reqwest")]
fn classify_failure(status: u16, retry_after: Option<Duration>, body: &[u8]) -> Error {
	let message = body_message(status, body);

	match status {
		401 | 403 => AuthorizationError::Denied { message, status: Some(status) }.into(),
		_ => TransientError::Endpoint { message, status: Some(status), retry_after }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn parse_json<'de, T>(body: &'de [u8], status: Option<u16>) -> Result<T>
where
	T: Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
		TransientError::ResponseParse {
			path: err.path().to_string(),
			message: err.inner().to_string(),
			status,
		}
		.into()
	})
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_parses_numeric_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, "30".parse().expect("Header fixture should parse."));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
	}

	#[test]
	fn retry_after_ignores_past_dates() {
		let mut headers = HeaderMap::new();

		headers.insert(
			RETRY_AFTER,
			"Wed, 21 Oct 2015 07:28:00 GMT".parse().expect("Header fixture should parse."),
		);

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn denials_map_to_authorization_errors() {
		let error = classify_failure(403, None, b"missing role assignment");

		assert_eq!(
			error,
			Error::from(AuthorizationError::Denied {
				message: "missing role assignment".into(),
				status: Some(403),
			}),
		);
	}

	#[test]
	fn throttles_keep_the_retry_hint() {
		let error = classify_failure(429, Some(Duration::seconds(30)), b"");

		assert_eq!(
			error,
			Error::from(TransientError::Endpoint {
				message: "HTTP 429".into(),
				status: Some(429),
				retry_after: Some(Duration::seconds(30)),
			}),
		);
	}
}
