//! Inbound webhook signature verification.
//!
//! TimeTree signs each webhook body with HMAC-SHA1 keyed by the app's webhook secret and sends
//! the digest as `X-Timetree-Signature: sha1=<lowercase hex>`. Verification only borrows the
//! request, so the body is still available to the handler afterwards.

// crates.io
use hmac::{Hmac, Mac};
use oauth2::http::Request;
use sha1::Sha1;
// self
use crate::{
	_prelude::*,
	obs::{self, CallKind, CallOutcome},
};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-timetree-signature";
/// Prefix naming the digest algorithm inside [`SIGNATURE_HEADER`].
pub const SIGNATURE_PREFIX: &str = "sha1=";

/// Shared secret configured for the app's webhooks.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(Vec<u8>);
impl WebhookSecret {
	/// Wraps the raw secret bytes.
	pub fn new(secret: impl Into<Vec<u8>>) -> Self {
		Self(secret.into())
	}

	/// Returns the secret bytes. Callers must avoid logging them.
	pub fn expose(&self) -> &[u8] {
		&self.0
	}
}
impl Debug for WebhookSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("WebhookSecret(<redacted>)")
	}
}

/// Checks webhook signatures against a fixed secret.
#[derive(Clone, Debug)]
pub struct WebhookVerifier {
	secret: WebhookSecret,
}
impl WebhookVerifier {
	/// Creates a verifier for `secret`.
	pub fn new(secret: impl Into<Vec<u8>>) -> Self {
		Self { secret: WebhookSecret::new(secret) }
	}

	/// Returns `true` when `request` carries a valid signature for its body.
	pub fn verify<B>(&self, request: &Request<B>) -> bool
	where
		B: AsRef<[u8]>,
	{
		self.verify_parts(request.headers(), request.body().as_ref())
	}

	/// Returns `true` when `headers` carry a valid signature for `body`.
	///
	/// The claimed digest must match the lowercase hex encoding exactly; a missing header, a
	/// missing `sha1=` prefix, or any other casing reads as an invalid signature. Digests are
	/// compared in constant time.
	pub fn verify_parts(&self, headers: &HeaderMap, body: &[u8]) -> bool {
		const KIND: CallKind = CallKind::Webhook;

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let verdict = self.check(headers, body);

		#[cfg(feature = "tracing")]
		if let Err(reason) = verdict {
			tracing::warn!(reason, body_len = body.len(), "Webhook signature rejected.");
		}

		match verdict {
			Ok(()) => {
				obs::record_call_outcome(KIND, CallOutcome::Success);

				true
			},
			Err(_) => {
				obs::record_call_outcome(KIND, CallOutcome::Failure);

				false
			},
		}
	}

	/// Computes the header value TimeTree would send for `body`.
	///
	/// Returns `None` only if the MAC rejects the secret as a key.
	pub fn sign(&self, body: &[u8]) -> Option<String> {
		let digest = self.mac(body)?.finalize().into_bytes();

		Some(format!("{SIGNATURE_PREFIX}{}", hex::encode(digest)))
	}

	fn check(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), &'static str> {
		let value = headers.get(SIGNATURE_HEADER).ok_or("missing header")?;
		let value = value.to_str().map_err(|_| "header is not visible ASCII")?;
		let claimed = value.strip_prefix(SIGNATURE_PREFIX).ok_or("unsupported algorithm prefix")?;

		// The service only emits lowercase hex; anything else cannot match its encoding.
		if !claimed.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
			return Err("digest is not lowercase hex");
		}

		let claimed = hex::decode(claimed).map_err(|_| "digest is not hex")?;

		self.mac(body)
			.ok_or("unusable secret")?
			.verify_slice(&claimed)
			.map_err(|_| "digest mismatch")
	}

	fn mac(&self, body: &[u8]) -> Option<HmacSha1> {
		let mut mac = <HmacSha1 as Mac>::new_from_slice(self.secret.expose()).ok()?;

		mac.update(body);

		Some(mac)
	}
}
