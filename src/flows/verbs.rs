// self
use crate::{
	_prelude::*,
	dispatch::{Dispatcher, RequestOptions},
	http::{HttpTransport, Method},
};

impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// `GET` without a body.
	pub async fn get<R>(&self, endpoint: &str, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.dispatch(endpoint, Method::Get, None::<&()>, options).await
	}

	/// `POST` with a JSON body.
	pub async fn post<R, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.dispatch(endpoint, Method::Post, Some(body), options).await
	}

	/// `PUT` with a JSON body.
	pub async fn put<R, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.dispatch(endpoint, Method::Put, Some(body), options).await
	}

	/// `PATCH` with a JSON body.
	pub async fn patch<R, B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.dispatch(endpoint, Method::Patch, Some(body), options).await
	}

	/// `DELETE` without a body.
	pub async fn delete<R>(&self, endpoint: &str, options: RequestOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.dispatch(endpoint, Method::Delete, None::<&()>, options).await
	}
}
