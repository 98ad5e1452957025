//! Time-controlled anti-forgery scenarios driven through an in-memory service fake.

// std
use std::{collections::VecDeque, sync::Arc};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{Duration, macros::datetime};
use url::Url;
// self
use secure_dispatch::{
	clock::ManualClock,
	config::DispatchConfig,
	dispatch::{Dispatcher, RequestOptions},
	error::{ConfigError, Error},
	http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportFuture},
	store::{CredentialStore, MemoryCredentialStore},
};

/// Issues scripted anti-forgery tokens and replays scripted resource responses.
#[derive(Default)]
struct FakeService {
	tokens: Mutex<VecDeque<&'static str>>,
	responses: Mutex<VecDeque<HttpResponse>>,
	seen: Mutex<Vec<HttpRequest>>,
}
impl FakeService {
	fn issue(&self, token: &'static str) {
		self.tokens.lock().push_back(token);
	}

	fn respond(&self, response: HttpResponse) {
		self.responses.lock().push_back(response);
	}

	fn token_fetches(&self) -> usize {
		self.seen.lock().iter().filter(|r| r.url.path() == "/api/csrf-token").count()
	}

	fn last_csrf_header(&self) -> Option<String> {
		self.seen
			.lock()
			.iter()
			.rev()
			.find(|r| r.url.path() != "/api/csrf-token")
			.and_then(|r| r.header("x-csrf-token").map(str::to_owned))
	}
}
impl HttpTransport for FakeService {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let is_issuer = request.url.path() == "/api/csrf-token";

			self.seen.lock().push(request);

			if is_issuer {
				let token = self.tokens.lock().pop_front().unwrap_or("exhausted");
				let body = json!({ "csrfToken": token, "expiresIn": 300 }).to_string();

				return Ok(HttpResponse::new(200, body));
			}

			Ok(self.responses.lock().pop_front().unwrap_or_else(|| HttpResponse::new(200, "{}")))
		})
	}
}

fn build() -> (Dispatcher<FakeService>, Arc<FakeService>, ManualClock) {
	let service = Arc::new(FakeService::default());
	let clock = ManualClock::new(datetime!(2025-06-01 09:00 UTC));
	let config = DispatchConfig::builder(
		Url::parse("https://learn.example.com").expect("Base URL should parse."),
	)
	.build()
	.expect("Default config should be valid.");
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::with_credential("jwt"));
	let dispatcher = Dispatcher::<FakeService>::with_transport(config, store, service.clone())
		.with_clock(Arc::new(clock.clone()));

	(dispatcher, service, clock)
}

async fn save_progress(dispatcher: &Dispatcher<FakeService>) -> Result<Value, Error> {
	dispatcher.post("/api/progress", &json!({ "lesson": 1 }), RequestOptions::default()).await
}

#[tokio::test]
async fn token_is_reused_inside_margin_and_replaced_after() {
	let (dispatcher, service, clock) = build();

	service.issue("T1");
	service.issue("T2");

	save_progress(&dispatcher).await.expect("First save should succeed.");

	assert_eq!(service.last_csrf_header().as_deref(), Some("T1"));
	assert_eq!(service.token_fetches(), 1);

	clock.advance(Duration::seconds(100));
	save_progress(&dispatcher).await.expect("Save at +100s should succeed.");

	assert_eq!(service.last_csrf_header().as_deref(), Some("T1"));
	assert_eq!(service.token_fetches(), 1);

	// 250s elapsed: 50s left, inside the 60s margin.
	clock.advance(Duration::seconds(150));
	save_progress(&dispatcher).await.expect("Save at +250s should succeed.");

	assert_eq!(service.last_csrf_header().as_deref(), Some("T2"));
	assert_eq!(service.token_fetches(), 2);
}

#[tokio::test]
async fn rejection_clears_cache_and_next_mutation_fetches() {
	let (dispatcher, service, _clock) = build();

	service.issue("T1");
	service.issue("T2");
	service.respond(HttpResponse::new(
		403,
		r#"{"code":"CSRF_TOKEN_INVALID","message":"Token expired."}"#,
	));

	let err = save_progress(&dispatcher).await.expect_err("Rejected save should fail.");

	assert!(matches!(err, Error::CsrfRejected { ref code } if code == "CSRF_TOKEN_INVALID"));
	assert!(dispatcher.csrf_cache().current().is_none());
	assert_eq!(dispatcher.csrf_cache().metrics().invalidations(), 1);

	save_progress(&dispatcher).await.expect("Retry by the caller should succeed.");

	assert_eq!(service.last_csrf_header().as_deref(), Some("T2"));
	assert_eq!(service.token_fetches(), 2);
}

#[tokio::test]
async fn retry_after_dates_are_measured_against_the_injected_clock() {
	let (dispatcher, service, _clock) = build();

	service.respond(
		HttpResponse::new(429, "").with_header("Retry-After", "Sun, 01 Jun 2025 09:01:30 +0000"),
	);

	let err = dispatcher
		.get::<Value>("/api/ai/quota", RequestOptions::default())
		.await
		.expect_err("Rate-limited call should fail.");

	assert!(matches!(err, Error::RateLimited { retry_after_seconds: Some(90) }));
	assert_eq!(service.token_fetches(), 0);
}

#[tokio::test]
async fn safe_verbs_ignore_csrf_regardless_of_options() {
	let (dispatcher, service, _clock) = build();

	for options in [RequestOptions::default(), RequestOptions::default().skip_csrf()] {
		dispatcher.get::<Value>("/api/lessons", options.clone()).await.expect("GET should succeed.");

		for method in [Method::Head, Method::Options] {
			dispatcher
				.dispatch::<Value, ()>("/api/lessons", method, None, options.clone())
				.await
				.unwrap_or_else(|e| panic!("{method} should succeed: {e}."));
		}
	}

	assert_eq!(service.token_fetches(), 0);
	assert_eq!(service.last_csrf_header(), None);

	let seen = service.seen.lock();

	assert!(seen.iter().all(|r| r.header("authorization") == Some("Bearer jwt")));
}

#[tokio::test]
async fn endpoints_never_leave_the_base_origin() {
	let (dispatcher, service, _clock) = build();

	for endpoint in ["https://evil.example/steal", "//evil.example/steal"] {
		let err = dispatcher
			.post::<Value, _>(endpoint, &json!({}), RequestOptions::default())
			.await
			.expect_err("Foreign endpoints should be refused.");

		assert!(matches!(err, Error::Config(ConfigError::ForeignEndpoint { .. })));
	}

	assert!(service.seen.lock().is_empty());
}

#[tokio::test]
async fn base_path_without_trailing_slash_is_kept() {
	let service = Arc::new(FakeService::default());
	let config = DispatchConfig::builder(
		Url::parse("http://localhost:3000/api").expect("Base URL should parse."),
	)
	.build()
	.expect("Base without trailing slash should be valid.");
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::default());
	let dispatcher = Dispatcher::<FakeService>::with_transport(config, store, service.clone());

	dispatcher
		.get::<Value>("/lessons", RequestOptions::default())
		.await
		.expect("GET should succeed.");

	let seen = service.seen.lock();

	assert_eq!(seen.len(), 1);
	assert_eq!(seen[0].url.as_str(), "http://localhost:3000/api/lessons");
}
