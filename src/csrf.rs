//! Anti-forgery token cache.
//!
//! [`CsrfTokenCache`] owns the single [`CsrfToken`] a dispatcher presents on mutating calls.
//! [`get`](CsrfTokenCache::get) returns the cached token while it is fresh (`now < expires_at
//! - safety_margin`) and otherwise fetches a new one from the issuing endpoint;
//! [`invalidate`](CsrfTokenCache::invalidate) drops it. Those two calls are the only mutation
//! points.
//!
//! Concurrent callers that find the cache stale each fetch independently unless single-flight
//! is enabled in [`CsrfSettings`]; the issuing endpoint is side-effect free, so the default
//! only costs redundant round trips. With single-flight on, callers queue behind one guard
//! and re-check the cache before fetching.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{CsrfToken, TokenSecret},
	clock::{Clock, SystemClock},
	config::CsrfSettings,
	error::IssuanceError,
	http::{HttpRequest, HttpTransport, Method},
	obs::{self, OperationKind, Outcome, RequestSpan},
};

/// Payload returned by the issuing endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssuedToken {
	csrf_token: TokenSecret,
	expires_in: i64,
}

/// Thread-safe counters for cache activity.
#[derive(Debug, Default)]
pub struct CsrfCacheMetrics {
	hits: AtomicU64,
	fetches: AtomicU64,
	failures: AtomicU64,
	invalidations: AtomicU64,
}
impl CsrfCacheMetrics {
	/// Returns the number of `get` calls answered from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches issued against the issuing endpoint.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches that failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of `invalidate` calls.
	pub fn invalidations(&self) -> u64 {
		self.invalidations.load(Ordering::Relaxed)
	}

	fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	fn record_invalidation(&self) {
		self.invalidations.fetch_add(1, Ordering::Relaxed);
	}
}

/// Cached anti-forgery token with expiry, invalidation, and optional single-flight fetches.
pub struct CsrfTokenCache<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	issuing_url: Url,
	safety_margin: Duration,
	clock: Arc<dyn Clock>,
	token: Mutex<Option<CsrfToken>>,
	fetch_guard: Option<AsyncMutex<()>>,
	metrics: CsrfCacheMetrics,
}
impl<T> CsrfTokenCache<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an empty cache that fetches from `issuing_url`.
	pub fn new(transport: Arc<T>, issuing_url: Url, settings: &CsrfSettings) -> Self {
		Self {
			transport,
			issuing_url,
			safety_margin: settings.safety_margin(),
			clock: Arc::new(SystemClock),
			token: Mutex::new(None),
			fetch_guard: settings.single_flight.then(|| AsyncMutex::new(())),
			metrics: CsrfCacheMetrics::default(),
		}
	}

	/// Replaces the clock used for freshness checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Returns a fresh token, fetching one when the cache is empty or stale.
	///
	/// Fails with [`Error::IssuanceFailed`] when the fetch fails; nothing is retried.
	pub async fn get(&self) -> Result<CsrfToken> {
		if let Some(token) = self.fresh_token() {
			self.metrics.record_hit();

			return Ok(token);
		}

		match &self.fetch_guard {
			Some(guard) => {
				let _singleflight = guard.lock().await;

				if let Some(token) = self.fresh_token() {
					self.metrics.record_hit();

					return Ok(token);
				}

				self.fetch().await
			},
			None => self.fetch().await,
		}
	}

	/// Drops the cached token. Idempotent.
	pub fn invalidate(&self) {
		self.token.lock().take();
		self.metrics.record_invalidation();
	}

	/// Snapshot of the cached token, fresh or not, without fetching.
	pub fn current(&self) -> Option<CsrfToken> {
		self.token.lock().clone()
	}

	/// Returns `true` if the cached token satisfies the freshness rule right now.
	pub fn is_fresh(&self) -> bool {
		self.fresh_token().is_some()
	}

	/// Lifetime left on the cached token by the server's expiry, ignoring the safety margin.
	pub fn remaining(&self) -> Option<Duration> {
		let now = self.clock.now_utc();

		self.token.lock().as_ref().map(|token| token.remaining_at(now))
	}

	/// Cache activity counters.
	pub fn metrics(&self) -> &CsrfCacheMetrics {
		&self.metrics
	}

	/// URL of the issuing endpoint.
	pub fn issuing_url(&self) -> &Url {
		&self.issuing_url
	}

	fn fresh_token(&self) -> Option<CsrfToken> {
		let now = self.clock.now_utc();

		self.token
			.lock()
			.as_ref()
			.filter(|token| token.is_fresh_at(now, self.safety_margin))
			.cloned()
	}

	async fn fetch(&self) -> Result<CsrfToken> {
		const KIND: OperationKind = OperationKind::CsrfIssuance;

		let span = RequestSpan::new(KIND, "fetch");

		obs::record_outcome(KIND, Outcome::Attempt);
		self.metrics.record_fetch();

		let result = span.instrument(self.fetch_inner()).await;

		match &result {
			Ok(token) => {
				*self.token.lock() = Some(token.clone());
			},
			Err(_) => self.metrics.record_failure(),
		}

		obs::record_outcome(KIND, Outcome::of(&result));

		result
	}

	async fn fetch_inner(&self) -> Result<CsrfToken> {
		let fetched_at = self.clock.now_utc();
		let mut request = HttpRequest::new(Method::Get, self.issuing_url.clone());

		request.set_header("accept", "application/json");

		let response = self
			.transport
			.execute(request)
			.await
			.map_err(|source| IssuanceError::Transport { source })?;

		if !response.is_success() {
			return Err(IssuanceError::Status { status: response.status }.into());
		}

		let mut de = serde_json::Deserializer::from_slice(&response.body);
		let issued: IssuedToken = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| IssuanceError::Parse { source, status: response.status })?;

		if issued.csrf_token.is_blank() {
			return Err(IssuanceError::EmptyToken.into());
		}
		if issued.expires_in <= 0 {
			return Err(IssuanceError::NonPositiveExpiresIn.into());
		}

		Ok(CsrfToken::issued(issued.csrf_token, fetched_at, Duration::seconds(issued.expires_in)))
	}
}
impl<T> Debug for CsrfTokenCache<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let remaining = self.remaining();
		let token = self.current();

		f.debug_struct("CsrfTokenCache")
			.field("issuing_url", &self.issuing_url.as_str())
			.field("safety_margin", &self.safety_margin)
			.field("single_flight", &self.fetch_guard.is_some())
			.field("token", &token)
			.field("remaining", &remaining)
			.finish()
	}
}
