//! Dispatcher configuration: the service base URL, anti-forgery settings, and auth routes.
//!
//! Values are assembled through [`DispatchConfigBuilder`] or loaded from JSON with
//! [`DispatchConfig::from_json`]; both paths run the same validation so a dispatcher never
//! starts with an unusable base URL or header name.

/// Builder and validation rules.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Anti-forgery token settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsrfSettings {
	/// Issuing endpoint path, resolved against the base URL.
	pub endpoint: String,
	/// Request header that carries the token on mutating calls.
	pub header: String,
	/// Seconds subtracted from the server expiry when judging freshness.
	pub safety_margin_secs: u64,
	/// Join concurrent fetches into one in-flight request.
	pub single_flight: bool,
	/// Structured error codes that mark a 403 as an anti-forgery rejection.
	pub rejection_codes: Vec<String>,
}
impl CsrfSettings {
	/// Default issuing endpoint.
	pub const DEFAULT_ENDPOINT: &'static str = "/api/csrf-token";
	/// Default anti-forgery header name.
	pub const DEFAULT_HEADER: &'static str = "X-CSRF-Token";
	/// Default safety margin in seconds.
	pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;
	/// Error code sent when the presented token is invalid or expired.
	pub const CODE_INVALID: &'static str = "CSRF_TOKEN_INVALID";
	/// Error code sent when no token was presented.
	pub const CODE_MISSING: &'static str = "CSRF_TOKEN_MISSING";

	/// Safety margin as a [`Duration`].
	pub fn safety_margin(&self) -> Duration {
		Duration::seconds(i64::try_from(self.safety_margin_secs).unwrap_or(i64::MAX))
	}

	/// Returns `true` if `code` marks an anti-forgery rejection.
	pub fn is_rejection_code(&self, code: &str) -> bool {
		self.rejection_codes.iter().any(|known| known == code)
	}
}
impl Default for CsrfSettings {
	fn default() -> Self {
		Self {
			endpoint: Self::DEFAULT_ENDPOINT.into(),
			header: Self::DEFAULT_HEADER.into(),
			safety_margin_secs: Self::DEFAULT_SAFETY_MARGIN_SECS,
			single_flight: false,
			rejection_codes: vec![Self::CODE_INVALID.into(), Self::CODE_MISSING.into()],
		}
	}
}

/// Routes used by the login/registration helpers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRoutes {
	/// Login endpoint path.
	pub login: String,
	/// Registration endpoint path.
	pub register: String,
}
impl Default for AuthRoutes {
	fn default() -> Self {
		Self { login: "/api/auth/login".into(), register: "/api/auth/register".into() }
	}
}

/// Immutable dispatcher configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
	/// Base URL every endpoint is resolved against.
	pub base_url: Url,
	/// Anti-forgery token settings.
	#[serde(default)]
	pub csrf: CsrfSettings,
	/// Auth flow routes.
	#[serde(default)]
	pub auth: AuthRoutes,
}
impl DispatchConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> DispatchConfigBuilder {
		DispatchConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(raw: &str) -> Result<Self, DispatchConfigError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			DispatchConfigError::Parse { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Appends an endpoint path to the base URL.
	///
	/// The base path is kept (`http://host/api` + `/lessons` is `http://host/api/lessons`).
	/// Absolute and protocol-relative endpoints are rejected with
	/// [`ConfigError::ForeignEndpoint`], as is anything that would leave the base origin.
	pub fn resolve(&self, endpoint: &str) -> Result<Url, ConfigError> {
		let foreign = || ConfigError::ForeignEndpoint { endpoint: endpoint.to_owned() };
		let invalid = |source: url::ParseError| ConfigError::InvalidEndpoint {
			endpoint: endpoint.to_owned(),
			source,
		};

		if endpoint.starts_with("//") {
			return Err(foreign());
		}

		match Url::parse(endpoint) {
			Ok(_) => return Err(foreign()),
			Err(url::ParseError::RelativeUrlWithoutBase) => {},
			Err(e) => return Err(invalid(e)),
		}

		let mut base = self.base_url.clone();

		base.set_query(None);
		base.set_fragment(None);

		let separator = if endpoint.starts_with('/') { "" } else { "/" };
		let joined = format!("{}{separator}{endpoint}", base.as_str().trim_end_matches('/'));
		let url = Url::parse(&joined).map_err(invalid)?;

		if url.origin() != self.base_url.origin() {
			return Err(foreign());
		}

		Ok(url)
	}
}
