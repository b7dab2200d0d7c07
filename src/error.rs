//! Crate-level error types shared by the request envelope, the authenticator, and the client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Service-level failures (a completed round trip with a 4xx/5xx status) are not represented
/// here; they travel in-band through [`ApiResponse`](crate::api::ApiResponse) and the decoded
/// [`ErrorEnvelope`](crate::api::ErrorEnvelope).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request or client construction failed.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body was present but could not be decoded into the requested type.
	#[error("Response body is not valid JSON for the requested type.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response that failed to decode.
		status: u16,
	},
	/// App assertion could not be signed.
	#[error("Unable to sign the app assertion.")]
	Signing(#[source] jsonwebtoken::errors::Error),
	/// The call context was cancelled.
	#[error("Call was cancelled.")]
	Cancelled,
	/// The call context deadline elapsed.
	#[error("Call deadline exceeded.")]
	DeadlineExceeded,
}
impl Error {
	/// Returns `true` for [`Error::Cancelled`] and [`Error::DeadlineExceeded`].
	pub fn is_cancellation(&self) -> bool {
		matches!(self, Self::Cancelled | Self::DeadlineExceeded)
	}
}

/// Construction failures raised before any network I/O happens.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// API origin is not an absolute base URL.
	#[error("API origin `{origin}` cannot be used as a base URL.")]
	InvalidOrigin {
		/// Origin that was rejected.
		origin: String,
	},
	/// Request path cannot be resolved against the API origin.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Path that failed to resolve.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Value cannot be used as a single path segment.
	#[error("`{segment}` cannot be used as a path segment.")]
	InvalidPathSegment {
		/// Rejected raw segment.
		segment: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[source] serde_json::Error),
	/// Query bodies must serialize to a JSON object.
	#[error("Query parameters must serialize to an object, got {found}.")]
	UnsupportedQuery {
		/// JSON kind that was produced instead.
		found: &'static str,
	},
	/// Bearer token contains bytes that are not valid in a header.
	#[error("Bearer token cannot be used as a header value.")]
	InvalidBearer(#[from] oauth2::http::header::InvalidHeaderValue),
	/// Private key is not a usable RSA key.
	#[error("Private key is not a valid RSA key.")]
	InvalidKey(#[source] jsonwebtoken::errors::Error),
	/// Token lifetime is outside the range accepted by the service.
	#[error("Token lifetime must be within 1..={max} seconds, got {seconds}.")]
	InvalidTokenLifetime {
		/// Rejected lifetime in seconds, fractions included.
		seconds: f64,
		/// Maximum lifetime in seconds.
		max: i64,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured cause.
	#[error("HTTP client error occurred while calling the API: {0}.")]
	Other(String),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
