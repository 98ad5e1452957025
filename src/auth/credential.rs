//! Bearer credential persisted by a [`CredentialStore`](crate::store::CredentialStore).

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Opaque bearer credential proving the caller's identity.
///
/// The dispatcher never keeps one of these around between calls; it reads a fresh copy from
/// the store on every authenticated request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(TokenSecret);
impl Credential {
	/// Wraps a bearer string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(TokenSecret::new(value))
	}

	/// Returns the raw bearer string. Callers must avoid logging it.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Formats the `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.expose())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl From<&str> for Credential {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Credential {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
