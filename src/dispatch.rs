//! Request dispatcher: credential injection, transport call, and response classification.

pub mod classify;

pub use classify::*;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	config::DispatchConfig,
	csrf::CsrfTokenCache,
	http::{HttpRequest, HttpResponse, HttpTransport, Method},
	obs::{self, OperationKind, Outcome, RequestSpan},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Dispatcher specialized for the crate's default reqwest transport.
pub type ReqwestDispatcher = Dispatcher<ReqwestTransport>;

/// Per-call switches and extra headers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Omit the bearer credential even when one is stored.
	pub skip_auth: bool,
	/// Omit the anti-forgery token on mutating calls.
	pub skip_csrf: bool,
	/// Caller-supplied headers merged over `content-type`.
	pub headers: BTreeMap<String, String>,
}
impl RequestOptions {
	/// Options for endpoints that must not see the bearer credential (login, registration).
	pub fn unauthenticated() -> Self {
		Self::default().skip_auth()
	}

	/// Omits the bearer credential.
	pub fn skip_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}

	/// Omits the anti-forgery token.
	pub fn skip_csrf(mut self) -> Self {
		self.skip_csrf = true;

		self
	}

	/// Adds a caller-supplied header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}
}

/// Everything known about one call while it is being dispatched.
#[derive(Clone, Debug)]
pub struct RequestContext<'a> {
	/// Endpoint as supplied by the caller.
	pub endpoint: &'a str,
	/// Request method.
	pub method: Method,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	/// Omit the bearer credential.
	pub skip_auth: bool,
	/// Omit the anti-forgery token.
	pub skip_csrf: bool,
	/// Caller-supplied headers.
	pub headers: &'a BTreeMap<String, String>,
}
impl<'a> RequestContext<'a> {
	/// Captures a call; serializes `body` up front so encoding errors surface before any I/O.
	pub fn new<B>(
		endpoint: &'a str,
		method: Method,
		body: Option<&B>,
		options: &'a RequestOptions,
	) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let body = body
			.map(serde_json::to_vec)
			.transpose()
			.map_err(|source| Error::Serialize { source })?;

		Ok(Self {
			endpoint,
			method,
			body,
			skip_auth: options.skip_auth,
			skip_csrf: options.skip_csrf,
			headers: &options.headers,
		})
	}

	/// Returns `true` when an anti-forgery token must be attached.
	pub fn needs_csrf(&self) -> bool {
		self.method.is_mutating() && !self.skip_csrf
	}
}

/// Dispatches typed JSON requests against a single service.
///
/// The dispatcher owns the anti-forgery cache and shares the transport with it; the credential
/// store is injected and only ever read here.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	config: DispatchConfig,
	transport: Arc<T>,
	credentials: Arc<dyn CredentialStore>,
	csrf: CsrfTokenCache<T>,
	clock: Arc<dyn Clock>,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher around a caller-provided transport.
	pub fn with_transport(
		config: DispatchConfig,
		credentials: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let transport = transport.into();
		let csrf = CsrfTokenCache::new(transport.clone(), issuing_url(&config), &config.csrf);

		Self { config, transport, credentials, csrf, clock: Arc::new(SystemClock) }
	}

	/// Replaces the clock used by the dispatcher and its anti-forgery cache.
	///
	/// Call before the first request: the cache is rebuilt empty.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.csrf = CsrfTokenCache::new(
			self.transport.clone(),
			issuing_url(&self.config),
			&self.config.csrf,
		)
		.with_clock(clock.clone());
		self.clock = clock;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &DispatchConfig {
		&self.config
	}

	/// Anti-forgery token cache owned by this dispatcher.
	pub fn csrf_cache(&self) -> &CsrfTokenCache<T> {
		&self.csrf
	}

	/// Credential store consulted on authenticated calls.
	pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
		&self.credentials
	}

	/// Sends one request and decodes the JSON response as `R`.
	///
	/// Steps run strictly in order: headers, bearer credential (unless `skip_auth`),
	/// anti-forgery token (mutating methods only, unless `skip_csrf`), transport call,
	/// classification. A 403 carrying an anti-forgery rejection code clears the cache before
	/// [`Error::CsrfRejected`] is returned; the request is not retried.
	pub async fn dispatch<R, B>(
		&self,
		endpoint: &str,
		method: Method,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.run(OperationKind::Dispatch, endpoint, method, body, options).await
	}

	pub(crate) async fn run<R, B>(
		&self,
		kind: OperationKind,
		endpoint: &str,
		method: Method,
		body: Option<&B>,
		options: RequestOptions,
	) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let span = RequestSpan::new(kind, "dispatch");

		obs::record_outcome(kind, Outcome::Attempt);

		let result = span.instrument(self.call(endpoint, method, body, &options)).await;

		obs::record_outcome(kind, Outcome::of(&result));

		result
	}

	async fn call<R, B>(
		&self,
		endpoint: &str,
		method: Method,
		body: Option<&B>,
		options: &RequestOptions,
	) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let context = RequestContext::new(endpoint, method, body, options)?;
		let response = self.send(context).await?;

		self.decode(response)
	}

	async fn send(&self, context: RequestContext<'_>) -> Result<HttpResponse> {
		let url = self.config.resolve(context.endpoint)?;
		let mut request = HttpRequest::new(context.method, url);

		request.set_header("content-type", "application/json");

		for (name, value) in context.headers {
			request.set_header(name, value.as_str());
		}

		let credential =
			if context.skip_auth { None } else { self.credentials.read().await? };

		if let Some(credential) = credential {
			request.set_header("authorization", credential.bearer_header());
		}
		if context.needs_csrf() {
			let token = self.csrf.get().await?;

			request.set_header(&self.config.csrf.header, token.value.expose());
		}

		request.body = context.body;

		obs::trace_event("sending request", context.method.as_str(), context.endpoint);

		Ok(self.transport.execute(request).await?)
	}

	fn decode<R>(&self, response: HttpResponse) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let class = classify(&response, &self.config.csrf, self.clock.now_utc());

		if let ResponseClass::CsrfRejected { .. } = &class {
			self.csrf.invalidate();
		}
		if let Some(err) = class.into_error() {
			return Err(err);
		}

		let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
			b"null"
		} else {
			&response.body
		};
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de).map_err(|e| Error::RequestFailed {
			message: format!("Response payload could not be decoded at `{}`: {}", e.path(), e.inner()),
			status: response.status,
		})
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestTransport> {
	/// Creates a dispatcher with its own reqwest transport (session cookies enabled).
	pub fn new(config: DispatchConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
		let transport = ReqwestTransport::new()?;

		Ok(Self::with_transport(config, credentials, transport))
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("base_url", &self.config.base_url.as_str())
			.field("csrf", &self.csrf)
			.finish()
	}
}

fn issuing_url(config: &DispatchConfig) -> Url {
	// Validated http(s) bases always join non-empty paths.
	config.resolve(&config.csrf.endpoint).unwrap_or_else(|_| config.base_url.clone())
}
