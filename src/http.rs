//! Transport primitives for dispatching JSON requests.
//!
//! The module exposes [`HttpTransport`] alongside the plain-data [`HttpRequest`] and
//! [`HttpResponse`] types so downstream crates can plug in custom HTTP stacks (or in-memory
//! fakes) without the dispatcher depending on any of them. Header names are stored
//! lowercase; lookups through [`HttpResponse::header`] are case-insensitive.

// std
use std::str::FromStr;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Header map keyed by lowercase header names.
pub type Headers = BTreeMap<String, String>;

/// Abstraction over HTTP stacks capable of executing dispatcher requests.
///
/// Implementations must include session cookies on every call (the anti-forgery token is bound
/// to the session that fetched it) and must return non-success statuses as ordinary
/// [`HttpResponse`] values; only failures that produced no response belong in
/// [`TransportError`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a single request.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP methods understood by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `HEAD`.
	Head,
	/// `OPTIONS`.
	Options,
	/// `TRACE`.
	Trace,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Head => "HEAD",
			Self::Options => "OPTIONS",
			Self::Trace => "TRACE",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}

	/// Returns `true` for methods that may change server state.
	pub const fn is_mutating(self) -> bool {
		!matches!(self, Self::Get | Self::Head | Self::Options | Self::Trace)
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Method {
	type Err = UnknownMethod;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"GET" => Ok(Self::Get),
			"HEAD" => Ok(Self::Head),
			"OPTIONS" => Ok(Self::Options),
			"TRACE" => Ok(Self::Trace),
			"POST" => Ok(Self::Post),
			"PUT" => Ok(Self::Put),
			"PATCH" => Ok(Self::Patch),
			"DELETE" => Ok(Self::Delete),
			_ => Err(UnknownMethod(s.to_owned())),
		}
	}
}

/// Raised when parsing an unsupported method token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported HTTP method `{0}`.")]
pub struct UnknownMethod(pub String);

/// Outgoing request described as plain data.
#[derive(Clone, Debug)]
pub struct HttpRequest {
	/// Request method.
	pub method: Method,
	/// Fully resolved target URL.
	pub url: Url,
	/// Request headers keyed by lowercase name.
	pub headers: Headers,
	/// Serialized JSON body, if any.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Headers::new(), body: None }
	}

	/// Inserts (or replaces) a header; the name is normalized to lowercase.
	pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.insert(name.to_ascii_lowercase(), value.into());
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}

/// Response described as plain data.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lowercase name.
	pub headers: Headers,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response with the given status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: Headers::new(), body: body.into() }
	}

	/// Adds a header; the name is normalized to lowercase.
	pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
		self.headers.insert(name.to_ascii_lowercase(), value.into());

		self
	}

	/// Case-insensitive header lookup.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The client must keep a cookie store: the issuing endpoint binds each anti-forgery token to
/// the session cookie it sets, and the service only accepts the token alongside that cookie.
/// [`ReqwestTransport::new`] enables the store; clients passed to
/// [`ReqwestTransport::with_client`] should be built with `cookie_store(true)`.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with a session cookie jar.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
				.map_err(TransportError::network)?;
			let mut headers = HeaderMap::new();

			for (name, value) in &request.headers {
				let name =
					HeaderName::from_bytes(name.as_bytes()).map_err(TransportError::network)?;
				let value = HeaderValue::from_str(value).map_err(TransportError::network)?;

				headers.insert(name, value);
			}

			let mut builder = client.request(method, request.url).headers(headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn collect_headers(map: &HeaderMap) -> Headers {
	let mut headers = Headers::new();

	for (name, value) in map {
		if let Ok(value) = value.to_str() {
			headers
				.entry(name.as_str().to_owned())
				.and_modify(|existing| {
					existing.push_str(", ");
					existing.push_str(value);
				})
				.or_insert_with(|| value.to_owned());
		}
	}

	headers
}

/// Parses a `Retry-After` value into whole seconds relative to `now`.
///
/// Accepts delta-seconds and HTTP dates; dates are rounded up to the next whole second and
/// dates in the past yield `Some(0)`. Unparsable values yield `None`.
pub fn parse_retry_after(raw: &str, now: OffsetDateTime) -> Option<u64> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(secs);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if !delta.is_positive() {
			return Some(0);
		}

		let whole = delta.whole_seconds();
		let rounded = if delta.subsec_nanoseconds() > 0 { whole + 1 } else { whole };

		return u64::try_from(rounded).ok();
	}

	None
}
