//! Login, registration, and logout helpers.
//!
//! Login and registration post credentials without a bearer header and persist the returned
//! token through the dispatcher's [`CredentialStore`](crate::store::CredentialStore). Logout is
//! purely local: it clears the stored credential and drops the cached anti-forgery token.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	dispatch::{Dispatcher, RequestOptions},
	http::{HttpTransport, Method},
	obs::{self, OperationKind, Outcome, RequestSpan},
};

/// Body sent to the login route.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest<'a> {
	/// Account email.
	pub email: &'a str,
	/// Account password.
	pub password: &'a str,
}
impl Debug for LoginRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Body sent to the registration route.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest<'a> {
	/// Account email.
	pub email: &'a str,
	/// Account password.
	pub password: &'a str,
	/// Public display name.
	pub username: &'a str,
}
impl Debug for RegisterRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisterRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.field("username", &self.username)
			.finish()
	}
}

/// Successful login payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LoginResponse {
	/// Bearer credential issued by the service.
	pub token: Credential,
	/// Service-defined user document.
	#[serde(default)]
	pub user: serde_json::Value,
	/// Optional human-readable message.
	#[serde(default)]
	pub message: Option<String>,
}

/// Successful registration payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegisterResponse {
	/// Bearer credential issued by the service.
	pub token: Credential,
	/// Service-defined user document.
	#[serde(default)]
	pub user: serde_json::Value,
	/// Optional human-readable message.
	#[serde(default)]
	pub message: Option<String>,
}

impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in and stores the returned credential.
	pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
		let route = self.config().auth.login.clone();
		let response: LoginResponse = self
			.run(
				OperationKind::Login,
				&route,
				Method::Post,
				Some(&LoginRequest { email, password }),
				RequestOptions::unauthenticated(),
			)
			.await?;

		self.credentials().write(response.token.clone()).await?;

		Ok(response)
	}

	/// Creates an account and stores the returned credential.
	pub async fn register(
		&self,
		email: &str,
		password: &str,
		username: &str,
	) -> Result<RegisterResponse> {
		let route = self.config().auth.register.clone();
		let response: RegisterResponse = self
			.run(
				OperationKind::Register,
				&route,
				Method::Post,
				Some(&RegisterRequest { email, password, username }),
				RequestOptions::unauthenticated(),
			)
			.await?;

		self.credentials().write(response.token.clone()).await?;

		Ok(response)
	}

	/// Clears the stored credential and the cached anti-forgery token. No request is sent.
	pub async fn logout(&self) -> Result<()> {
		const KIND: OperationKind = OperationKind::Logout;

		let span = RequestSpan::new(KIND, "logout");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span.instrument(self.credentials().clear()).await.map_err(Error::from);

		// The anti-forgery token is bound to the old session either way.
		self.csrf_cache().invalidate();
		obs::record_outcome(KIND, Outcome::of(&result));

		result
	}

	/// Returns `true` when a credential is currently stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.credentials().read().await?.is_some())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_bodies_use_service_field_names() {
		let login = serde_json::to_value(LoginRequest { email: "ada@example.com", password: "pw" })
			.expect("Login body should serialize.");

		assert_eq!(login, serde_json::json!({ "email": "ada@example.com", "password": "pw" }));

		let register = serde_json::to_value(RegisterRequest {
			email: "ada@example.com",
			password: "pw",
			username: "ada",
		})
		.expect("Registration body should serialize.");

		assert_eq!(register["username"], "ada");
	}

	#[test]
	fn passwords_are_redacted_in_debug_output() {
		let rendered = format!("{:?}", LoginRequest { email: "ada@example.com", password: "hunter2" });

		assert!(rendered.contains("ada@example.com"));
		assert!(!rendered.contains("hunter2"));
	}

	#[test]
	fn responses_tolerate_missing_optional_fields() {
		let response: LoginResponse =
			serde_json::from_str(r#"{"token":"jwt-1","user":{"id":7}}"#)
				.expect("Login payload should decode.");

		assert_eq!(response.token.expose(), "jwt-1");
		assert_eq!(response.user["id"], 7);
		assert!(response.message.is_none());

		let response: RegisterResponse = serde_json::from_str(r#"{"token":"jwt-2"}"#)
			.expect("Registration payload without user should decode.");

		assert!(response.user.is_null());
	}
}
