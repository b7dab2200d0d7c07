//! Authenticated resource calls on behalf of one installation.
//!
//! [`CalendarAppClient`] pairs the shared [`ApiClient`] with an installation access token and
//! decodes responses into caller-supplied types. Resource models are left to the caller.

// self
use crate::{
	_prelude::*,
	api::{ApiClient, ApiMethod, ApiResponse, CallContext},
	auth::{AccessTokenResponse, TokenSecret},
	http::ApiHttpClient,
};

/// Resource client bound to an installation access token.
pub struct CalendarAppClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	api: ApiClient<C>,
	access_token: TokenSecret,
}
impl<C> CalendarAppClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that authenticates every call with `access_token`.
	pub fn new(api: ApiClient<C>, access_token: TokenSecret) -> Self {
		Self { api, access_token }
	}

	/// Creates a client from a successful token exchange.
	pub fn from_token_response(api: ApiClient<C>, response: &AccessTokenResponse) -> Self {
		Self::new(api, response.access_token.clone())
	}

	/// Shared request envelope.
	pub fn api(&self) -> &ApiClient<C> {
		&self.api
	}

	/// Swaps in a freshly issued access token.
	pub fn set_access_token(&mut self, access_token: TokenSecret) {
		self.access_token = access_token;
	}

	/// `GET path`, with `query` merged into the query string.
	pub async fn get<Q, T>(
		&self,
		ctx: &CallContext,
		path: &str,
		query: Option<&Q>,
	) -> Result<(T, ApiResponse)>
	where
		Q: ?Sized + Serialize,
		T: DeserializeOwned + Default + Send,
	{
		self.call(ctx, ApiMethod::Get, path, query).await
	}

	/// `POST path` with a JSON body.
	pub async fn post<B, T>(
		&self,
		ctx: &CallContext,
		path: &str,
		body: Option<&B>,
	) -> Result<(T, ApiResponse)>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default + Send,
	{
		self.call(ctx, ApiMethod::Post, path, body).await
	}

	/// `PUT path` with a JSON body.
	pub async fn put<B, T>(
		&self,
		ctx: &CallContext,
		path: &str,
		body: Option<&B>,
	) -> Result<(T, ApiResponse)>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default + Send,
	{
		self.call(ctx, ApiMethod::Put, path, body).await
	}

	/// `DELETE path`, with `query` merged into the query string.
	pub async fn delete<Q, T>(
		&self,
		ctx: &CallContext,
		path: &str,
		query: Option<&Q>,
	) -> Result<(T, ApiResponse)>
	where
		Q: ?Sized + Serialize,
		T: DeserializeOwned + Default + Send,
	{
		self.call(ctx, ApiMethod::Delete, path, query).await
	}

	async fn call<B, T>(
		&self,
		ctx: &CallContext,
		method: ApiMethod,
		path: &str,
		body: Option<&B>,
	) -> Result<(T, ApiResponse)>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned + Default + Send,
	{
		let request =
			self.api.new_request(method, path, Some(self.access_token.expose()), body)?;

		self.api.execute_json(ctx, request).await
	}
}
impl<C> Clone for CalendarAppClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self { api: self.api.clone(), access_token: self.access_token.clone() }
	}
}
impl<C> Debug for CalendarAppClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CalendarAppClient")
			.field("api", &self.api)
			.field("access_token", &self.access_token)
			.finish()
	}
}
