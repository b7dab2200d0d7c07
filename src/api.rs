//! Request envelope shared by every call against the TimeTree API.
//!
//! [`ApiClient`] builds requests against a fixed origin, attaches the standard headers and an
//! optional bearer token, executes them through an injected [`ApiHttpClient`], and hands back
//! the status and headers of every completed round trip. It holds no credentials, so a single
//! instance can be shared by the authenticator and the resource client.

pub mod context;
pub mod response;

mod query;

pub use context::*;
pub use response::*;

// std
use std::io::Write;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	http::{self, ApiHttpClient},
	obs::{self, CallKind, CallOutcome, CallSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Production API origin.
pub const API_ORIGIN: &str = "https://timetreeapis.com";
/// Versioned media type sent in the `Accept` header.
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.timetree.v1+json";

const JSON_MEDIA_TYPE: &str = "application/json";
// RFC 3986 unreserved characters stay literal; everything else is escaped.
const PATH_SEGMENT: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Escapes `raw` so it occupies exactly one path segment.
///
/// `/`, `?`, `#`, and `%` are percent-encoded. `.` and `..` are rejected because URL resolution
/// collapses them even when escaped.
pub fn path_segment(raw: &str) -> Result<String> {
	if raw.is_empty() || raw == "." || raw == ".." {
		return Err(ConfigError::InvalidPathSegment { segment: raw.into() }.into());
	}

	Ok(percent_encoding::utf8_percent_encode(raw, PATH_SEGMENT).to_string())
}

/// HTTP methods accepted by the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMethod {
	/// `GET`; the body becomes query parameters.
	Get,
	/// `POST`; the body becomes a JSON payload.
	Post,
	/// `PUT`; the body becomes a JSON payload.
	Put,
	/// `DELETE`; the body becomes query parameters.
	Delete,
}
impl ApiMethod {
	/// Returns the method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApiMethod::Get => "GET",
			ApiMethod::Post => "POST",
			ApiMethod::Put => "PUT",
			ApiMethod::Delete => "DELETE",
		}
	}

	fn carries_query(self) -> bool {
		matches!(self, ApiMethod::Get | ApiMethod::Delete)
	}

	fn to_http(self) -> Method {
		match self {
			ApiMethod::Get => Method::GET,
			ApiMethod::Post => Method::POST,
			ApiMethod::Put => Method::PUT,
			ApiMethod::Delete => Method::DELETE,
		}
	}
}
impl Display for ApiMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully constructed request, ready for [`ApiClient::execute`].
#[derive(Clone)]
pub struct ApiRequest {
	method: ApiMethod,
	url: Url,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiRequest {
	/// Request method.
	pub fn method(&self) -> ApiMethod {
		self.method
	}

	/// Absolute request URL, query included.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Request headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Serialized JSON payload; empty for query-carrying methods.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Sets (or replaces) the `Authorization: Bearer` header.
	pub fn set_bearer(&mut self, token: &str) -> Result<()> {
		let mut value =
			HeaderValue::try_from(format!("Bearer {token}")).map_err(ConfigError::from)?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(())
	}

	/// Converts the request into the transport representation.
	pub fn into_http(self) -> Result<HttpRequest> {
		let mut builder =
			oauth2::http::Request::builder().method(self.method.to_http()).uri(self.url.as_str());

		if let Some(headers) = builder.headers_mut() {
			*headers = self.headers;
		}

		builder.body(self.body).map_err(|e| ConfigError::from(e).into())
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authenticated", &self.headers.contains_key(AUTHORIZATION))
			.field("body_len", &self.body.len())
			.finish()
	}
}

/// Stateless request executor bound to an API origin and an injected transport.
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	origin: Url,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client for the production origin that uses `http_client` for every call.
	pub fn with_http_client(http_client: impl Into<Arc<C>>) -> Result<Self> {
		let origin = Url::parse(API_ORIGIN)
			.map_err(|_| ConfigError::InvalidOrigin { origin: API_ORIGIN.into() })?;

		Ok(Self { http_client: http_client.into(), origin })
	}

	/// Points the client at another origin (staging, proxies, mock servers).
	pub fn with_origin(mut self, origin: Url) -> Result<Self> {
		if origin.cannot_be_a_base() {
			return Err(ConfigError::InvalidOrigin { origin: origin.into() }.into());
		}

		self.origin = origin;

		Ok(self)
	}

	/// Origin every path is resolved against.
	pub fn origin(&self) -> &Url {
		&self.origin
	}

	/// Builds a request for `path`.
	///
	/// GET and DELETE bodies are merged into the query string; POST and PUT bodies are
	/// serialized as JSON. An empty or missing `access_token` leaves the request
	/// unauthenticated.
	pub fn new_request<B>(
		&self,
		method: ApiMethod,
		path: &str,
		access_token: Option<&str>,
		body: Option<&B>,
	) -> Result<ApiRequest>
	where
		B: ?Sized + Serialize,
	{
		let path = match body {
			Some(body) if method.carries_query() => query::merge_query(path, body)?,
			_ => path.to_owned(),
		};
		let url = self
			.origin
			.join(&path)
			.map_err(|source| ConfigError::InvalidPath { path: path.clone(), source })?;
		let payload = match body {
			Some(body) if !method.carries_query() =>
				serde_json::to_vec(body).map_err(ConfigError::Serialize)?,
			_ => Vec::new(),
		};
		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));
		headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));

		let mut request = ApiRequest { method, url, headers, body: payload };

		if let Some(token) = access_token.filter(|token| !token.is_empty()) {
			request.set_bearer(token)?;
		}

		Ok(request)
	}

	/// Executes `request` under `ctx` and writes the body into `destination`.
	///
	/// The status and headers come back for every completed round trip, including non-2xx
	/// responses. An empty body never fails a [`Destination::Json`] decode.
	pub async fn execute<T>(
		&self,
		ctx: &CallContext,
		request: ApiRequest,
		destination: Destination<'_, T>,
	) -> Result<ApiResponse>
	where
		T: DeserializeOwned + Send,
	{
		const KIND: CallKind = CallKind::Api;

		let span = CallSpan::new(KIND, "execute");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.dispatch(ctx, request, destination)).await;

		obs::record_call_result(KIND, &result);

		result
	}

	/// Executes `request` and decodes the body into a fresh `T`.
	pub async fn execute_json<T>(
		&self,
		ctx: &CallContext,
		request: ApiRequest,
	) -> Result<(T, ApiResponse)>
	where
		T: DeserializeOwned + Default + Send,
	{
		let mut value = T::default();
		let response = self.execute(ctx, request, Destination::Json(&mut value)).await?;

		Ok((value, response))
	}

	async fn dispatch<T>(
		&self,
		ctx: &CallContext,
		request: ApiRequest,
		destination: Destination<'_, T>,
	) -> Result<ApiResponse>
	where
		T: DeserializeOwned + Send,
	{
		let method = request.method;
		let http_request = request.into_http()?;
		let handle = self.http_client.handle();
		let response = match ctx.run(handle.call(http_request)).await? {
			Ok(response) => response,
			Err(err) => {
				// A transport failure after the context is done is reported as the context error.
				if let Some(done) = ctx.err() {
					return Err(done);
				}

				#[cfg(feature = "tracing")]
				tracing::debug!(%method, error = ?err, "Transport failed.");
				#[cfg(not(feature = "tracing"))]
				let _ = method;

				return Err(http::map_transport_error(err));
			},
		};
		let (parts, body) = response.into_parts();

		match destination {
			Destination::Discard => {},
			Destination::Raw(sink) => sink.write_all(&body).map_err(TransportError::Io)?,
			Destination::Json(target) =>
				if let Some(value) = decode_json(parts.status, &body)? {
					*target = value;
				},
		}

		Ok(ApiResponse { status: parts.status, headers: parts.headers })
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client for the production origin backed by a fresh reqwest transport.
	pub fn new() -> Result<Self> {
		Self::with_http_client(ReqwestHttpClient::default())
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self { http_client: self.http_client.clone(), origin: self.origin.clone() }
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("origin", &self.origin.as_str()).finish()
	}
}

/// Decodes a JSON body, treating a blank body as "no content".
fn decode_json<T>(status: StatusCode, body: &[u8]) -> Result<Option<T>>
where
	T: DeserializeOwned,
{
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(None);
	}

	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map(Some)
		.map_err(|source| Error::Decode { source, status: status.as_u16() })
}
