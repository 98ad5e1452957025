//! Credential-aware request dispatch for JSON HTTP services: bearer credentials, cached
//! anti-forgery tokens, and classified failures behind one typed call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod clock;
pub mod config;
pub mod csrf;
pub mod dispatch;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::DispatchConfig,
		dispatch::Dispatcher,
		http::ReqwestTransport,
		store::{CredentialStore, MemoryCredentialStore},
	};

	/// Dispatcher type alias used by reqwest-backed integration tests.
	pub type ReqwestTestDispatcher = Dispatcher<ReqwestTransport>;

	/// Builds a reqwest transport with a session cookie jar that accepts the self-signed
	/// certificates produced by `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.cookie_store(true)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Parses a base URL and builds a default [`DispatchConfig`] around it.
	pub fn test_config(base_url: &str) -> DispatchConfig {
		let base_url = Url::parse(base_url).expect("Test base URL should parse.");

		DispatchConfig::builder(base_url).build().expect("Default test config should be valid.")
	}

	/// Constructs a [`Dispatcher`] backed by an in-memory credential store and the reqwest
	/// transport used across integration tests.
	pub fn build_reqwest_test_dispatcher(
		config: DispatchConfig,
	) -> (ReqwestTestDispatcher, Arc<MemoryCredentialStore>) {
		let store_backend = Arc::new(MemoryCredentialStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let dispatcher =
			ReqwestTestDispatcher::with_transport(config, store, test_reqwest_transport());

		(dispatcher, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
