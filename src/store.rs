//! Credential storage contract and built-in store implementations.
//!
//! The dispatcher only ever calls [`CredentialStore::read`]; writes and clears belong to the
//! login/logout helpers (or whatever external flow owns the credential lifecycle).

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable slot holding the bearer credential.
///
/// Implementations must not cache across calls in a way that hides external updates: every
/// [`read`](CredentialStore::read) reflects the most recent write or clear.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the persisted credential, if any.
	fn read(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Persists or replaces the credential.
	fn write(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Erases the credential. Clearing an empty slot is a no-op.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
