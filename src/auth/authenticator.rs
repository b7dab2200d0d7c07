//! Installation access token issuance.
//!
//! [`CalendarAppAuthenticator`] owns the app's private key. Every call to
//! [`CalendarAppAuthenticator::access_token`] signs a fresh assertion and performs exactly one
//! `POST /installations/{id}/access_tokens`; nothing is cached, refreshed, or retried.

// self
use crate::{
	_prelude::*,
	api::{self, ApiClient, ApiMethod, ApiResponse, CallContext, ErrorEnvelope},
	auth::{
		AppAssertion, AppSigningKey, ApplicationId, AssertionClaims, DEFAULT_TOKEN_LIFETIME,
		InstallationId, MAX_TOKEN_LIFETIME, TokenSecret,
	},
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, CallKind, CallOutcome, CallSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Body returned by the token exchange.
///
/// Fields the service omits keep their zero values; failures populate [`Self::error`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessTokenResponse {
	/// Installation access token.
	pub access_token: TokenSecret,
	/// Expiry reported by the service, epoch seconds.
	pub expire_at: i64,
	/// Token type, typically `Bearer`.
	pub token_type: String,
	/// Service error detail, present on failed exchanges.
	#[serde(flatten)]
	pub error: Option<ErrorEnvelope>,
}
impl AccessTokenResponse {
	/// Returns the service-reported expiry, if one was sent.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		if self.expire_at == 0 {
			return None;
		}

		OffsetDateTime::from_unix_timestamp(self.expire_at).ok()
	}
}

/// Builder for [`CalendarAppAuthenticator`].
#[derive(Debug)]
pub struct CalendarAppAuthenticatorBuilder {
	/// App identifier used as the assertion issuer.
	pub application_id: ApplicationId,
	/// PEM-encoded RSA private key.
	pub private_key_pem: Vec<u8>,
	/// Assertion lifetime.
	pub token_lifetime: Duration,
}
impl CalendarAppAuthenticatorBuilder {
	/// Creates a builder with the default 600 second lifetime.
	pub fn new(application_id: ApplicationId, private_key_pem: impl Into<Vec<u8>>) -> Self {
		Self {
			application_id,
			private_key_pem: private_key_pem.into(),
			token_lifetime: DEFAULT_TOKEN_LIFETIME,
		}
	}

	/// Overrides the assertion lifetime (1 to 600 seconds).
	pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
		self.token_lifetime = lifetime;

		self
	}

	/// Builds an authenticator that shares `api` (and its transport) with other callers.
	pub fn build_with_api<C>(self, api: ApiClient<C>) -> Result<CalendarAppAuthenticator<C>>
	where
		C: ?Sized + ApiHttpClient,
	{
		let seconds = self.token_lifetime.whole_seconds();

		if seconds <= 0 || self.token_lifetime > MAX_TOKEN_LIFETIME {
			return Err(ConfigError::InvalidTokenLifetime {
				seconds: self.token_lifetime.as_seconds_f64(),
				max: MAX_TOKEN_LIFETIME.whole_seconds(),
			}
			.into());
		}

		let signing_key = AppSigningKey::from_pem(&self.private_key_pem)?;

		Ok(CalendarAppAuthenticator {
			application_id: self.application_id,
			signing_key,
			token_lifetime: Duration::seconds(seconds),
			api,
		})
	}

	/// Builds an authenticator for the production origin over `http_client`.
	pub fn build_with_http_client<C>(
		self,
		http_client: impl Into<Arc<C>>,
	) -> Result<CalendarAppAuthenticator<C>>
	where
		C: ?Sized + ApiHttpClient,
	{
		self.build_with_api(ApiClient::with_http_client(http_client)?)
	}

	/// Builds an authenticator backed by a fresh reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<CalendarAppAuthenticator<ReqwestHttpClient>> {
		self.build_with_http_client(ReqwestHttpClient::default())
	}
}

/// Exchanges signed app assertions for installation access tokens.
pub struct CalendarAppAuthenticator<C>
where
	C: ?Sized + ApiHttpClient,
{
	application_id: ApplicationId,
	signing_key: AppSigningKey,
	token_lifetime: Duration,
	api: ApiClient<C>,
}
impl<C> CalendarAppAuthenticator<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// App identifier used as the assertion issuer.
	pub fn application_id(&self) -> &ApplicationId {
		&self.application_id
	}

	/// Lifetime stamped into every assertion.
	pub fn token_lifetime(&self) -> Duration {
		self.token_lifetime
	}

	/// Request envelope used for token exchanges.
	pub fn api(&self) -> &ApiClient<C> {
		&self.api
	}

	/// Signs an assertion issued at `issued_at`.
	pub fn assertion_at(&self, issued_at: OffsetDateTime) -> Result<AppAssertion> {
		let claims = AssertionClaims::new(&self.application_id, issued_at, self.token_lifetime);

		AppAssertion::sign(&self.signing_key, claims)
	}

	/// Signs an assertion issued now.
	pub fn assertion(&self) -> Result<AppAssertion> {
		self.assertion_at(OffsetDateTime::now_utc())
	}

	/// Requests an access token for `installation_id`.
	///
	/// The response comes back for every completed round trip; check
	/// [`ApiResponse::is_success`] and [`AccessTokenResponse::error`] before using the token.
	pub async fn access_token(
		&self,
		ctx: &CallContext,
		installation_id: &InstallationId,
	) -> Result<(AccessTokenResponse, ApiResponse)> {
		const KIND: CallKind = CallKind::AccessToken;

		let span = CallSpan::new(KIND, "access_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let assertion = self.assertion()?;
				let segment = api::path_segment(installation_id)?;
				let path = format!("/installations/{segment}/access_tokens");
				let mut request = self.api.new_request::<()>(ApiMethod::Post, &path, None, None)?;

				request.set_bearer(assertion.token().expose())?;

				let (token, response) =
					self.api.execute_json::<AccessTokenResponse>(ctx, request).await?;

				#[cfg(feature = "tracing")]
				if !response.is_success() {
					tracing::warn!(
						status = response.status.as_u16(),
						error = token.error.as_ref().map(|e| e.to_string()),
						"Access token exchange was rejected."
					);
				}

				Ok((token, response))
			})
			.await;

		obs::record_call_result(KIND, &result);

		result
	}
}
#[cfg(feature = "reqwest")]
impl CalendarAppAuthenticator<ReqwestHttpClient> {
	/// Starts building an authenticator for `application_id`.
	///
	/// The builder is transport agnostic; use
	/// [`CalendarAppAuthenticatorBuilder::build_with_api`] to run over another transport.
	pub fn builder(
		application_id: ApplicationId,
		private_key_pem: impl Into<Vec<u8>>,
	) -> CalendarAppAuthenticatorBuilder {
		CalendarAppAuthenticatorBuilder::new(application_id, private_key_pem)
	}
}
impl<C> Debug for CalendarAppAuthenticator<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CalendarAppAuthenticator")
			.field("application_id", &self.application_id)
			.field("token_lifetime", &self.token_lifetime)
			.field("api", &self.api)
			.finish()
	}
}
