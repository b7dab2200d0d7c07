//! RS256 app assertions proving calendar app identity.
//!
//! An assertion is a short-lived JWT whose issuer is the [`ApplicationId`]. It is minted for a
//! single token exchange and never reused.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{ApplicationId, TokenSecret},
	error::ConfigError,
};

/// Lifetime used when the builder is not given one.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::seconds(600);
/// Longest lifetime the service accepts.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::seconds(600);

/// Registered claims carried by an app assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer; the application identifier.
	pub iss: String,
	/// Issued-at, epoch seconds.
	pub iat: i64,
	/// Expiry, epoch seconds. Always `iat` plus the configured lifetime.
	pub exp: i64,
}
impl AssertionClaims {
	/// Builds the claim set for `issuer` issued at `issued_at`.
	pub fn new(issuer: &ApplicationId, issued_at: OffsetDateTime, lifetime: Duration) -> Self {
		let iat = issued_at.unix_timestamp();

		Self { iss: issuer.to_string(), iat, exp: iat + lifetime.whole_seconds() }
	}

	/// Validity window covered by the claims.
	pub fn lifetime(&self) -> Duration {
		Duration::seconds(self.exp - self.iat)
	}
}

/// RSA private key used to sign assertions; parsed once and read-only afterwards.
#[derive(Clone)]
pub struct AppSigningKey(EncodingKey);
impl AppSigningKey {
	/// Parses a PKCS#1 or PKCS#8 PEM-encoded RSA private key.
	///
	/// PEM decoding alone does not parse the RSA structure, so a probe signature is produced to
	/// reject corrupt key material here rather than on the first token exchange.
	pub fn from_pem(pem: &[u8]) -> Result<Self> {
		let key = EncodingKey::from_rsa_pem(pem).map_err(ConfigError::InvalidKey)?;
		let probe = AssertionClaims { iss: "probe".into(), iat: 0, exp: 0 };

		jsonwebtoken::encode(&Header::new(Algorithm::RS256), &probe, &key)
			.map_err(ConfigError::InvalidKey)?;

		Ok(Self(key))
	}

	/// Signs `claims` with RS256.
	pub fn sign(&self, claims: &AssertionClaims) -> Result<String> {
		jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &self.0).map_err(Error::Signing)
	}
}
impl Debug for AppSigningKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("AppSigningKey(<redacted>)")
	}
}

/// Signed assertion plus the claims it carries.
#[derive(Clone, Debug)]
pub struct AppAssertion {
	/// Claims embedded in the token.
	pub claims: AssertionClaims,
	token: TokenSecret,
}
impl AppAssertion {
	/// Signs a fresh assertion.
	pub fn sign(key: &AppSigningKey, claims: AssertionClaims) -> Result<Self> {
		let token = TokenSecret::new(key.sign(&claims)?);

		Ok(Self { claims, token })
	}

	/// Compact JWT serialization used as the bearer credential.
	pub fn token(&self) -> &TokenSecret {
		&self.token
	}
}
