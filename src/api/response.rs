//! Response metadata, rate-limit snapshots, service error envelopes, and decode destinations.

// std
use std::io::Write;
// self
use crate::_prelude::*;

/// Header carrying the request quota for the current window.
pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
/// Header carrying the remaining requests in the current window.
pub const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the window reset instant in epoch seconds.
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";

/// Where [`ApiClient::execute`](crate::api::ApiClient::execute) writes the response body.
pub enum Destination<'a, T> {
	/// Drop the body.
	Discard,
	/// Copy the raw bytes verbatim.
	Raw(&'a mut (dyn Write + Send)),
	/// Decode the body as JSON into the target. An empty body leaves the target untouched.
	Json(&'a mut T),
}
impl<T> Debug for Destination<'_, T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Discard => f.write_str("Destination::Discard"),
			Self::Raw(_) => f.write_str("Destination::Raw(..)"),
			Self::Json(_) => f.write_str("Destination::Json(..)"),
		}
	}
}

/// Status and headers of a completed round trip.
///
/// Returned for every status code; callers decide what counts as a failure.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Extracts the rate-limit snapshot from the headers.
	pub fn rate_limit(&self) -> RateLimit {
		RateLimit::from_headers(&self.headers)
	}
}

/// Quota state reported by the service on a single response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimit {
	/// Requests allowed per window.
	pub limit: u64,
	/// Requests left in the current window.
	pub remaining: u64,
	/// Window reset instant in epoch seconds.
	pub reset: u64,
}
impl RateLimit {
	/// Parses the rate-limit headers. Absent or non-numeric values read as zero.
	pub fn from_headers(headers: &HeaderMap) -> Self {
		Self {
			limit: header_u64(headers, HEADER_RATE_LIMIT),
			remaining: header_u64(headers, HEADER_RATE_REMAINING),
			reset: header_u64(headers, HEADER_RATE_RESET),
		}
	}

	/// Returns the reset instant, or `None` when the service did not report one.
	pub fn reset_at(&self) -> Option<OffsetDateTime> {
		if self.reset == 0 {
			return None;
		}

		OffsetDateTime::from_unix_timestamp(i64::try_from(self.reset).ok()?).ok()
	}
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.and_then(|raw| raw.trim().parse().ok())
		.unwrap_or_default()
}

/// Failure detail reported by the service in a JSON body.
///
/// Response types embed it as `#[serde(flatten)] error: Option<ErrorEnvelope>`; it decodes to
/// `None` unless at least one of `type`, `status`, or `title` is present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawErrorEnvelope")]
pub struct ErrorEnvelope {
	/// Error type URI.
	#[serde(rename = "type", skip_serializing_if = "String::is_empty")]
	pub kind: String,
	/// HTTP status echoed in the body.
	#[serde(skip_serializing_if = "is_zero")]
	pub status: u16,
	/// Human-readable summary.
	#[serde(skip_serializing_if = "String::is_empty")]
	pub title: String,
}
impl Display for ErrorEnvelope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match (self.status, self.title.is_empty()) {
			(0, true) => f.write_str(&self.kind),
			(0, false) => f.write_str(&self.title),
			(status, true) => write!(f, "{status}"),
			(status, false) => write!(f, "{status} {}", self.title),
		}
	}
}
impl TryFrom<RawErrorEnvelope> for ErrorEnvelope {
	type Error = &'static str;

	fn try_from(raw: RawErrorEnvelope) -> Result<Self, Self::Error> {
		if raw.kind.is_none() && raw.status.is_none() && raw.title.is_none() {
			return Err("no error fields present");
		}

		Ok(Self {
			kind: raw.kind.unwrap_or_default(),
			status: raw.status.unwrap_or_default(),
			title: raw.title.unwrap_or_default(),
		})
	}
}

#[derive(Deserialize)]
struct RawErrorEnvelope {
	#[serde(rename = "type")]
	kind: Option<String>,
	status: Option<u16>,
	title: Option<String>,
}

fn is_zero(value: &u16) -> bool {
	*value == 0
}
