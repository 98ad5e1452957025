// self
use crate::{
	_prelude::*,
	config::{AuthRoutes, CsrfSettings, DispatchConfig},
};

/// Errors raised while constructing or validating a [`DispatchConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DispatchConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`: {message}.")]
	Parse {
		/// Path of the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Base URL must use HTTP(S).
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// A route path was left empty.
	#[error("The {route} route must not be empty.")]
	EmptyRoute {
		/// Which route failed validation.
		route: &'static str,
	},
	/// Header name contains characters outside the HTTP token set.
	#[error("Header name `{name}` is not a valid HTTP token.")]
	InvalidHeaderName {
		/// Header name that failed validation.
		name: String,
	},
	/// No anti-forgery rejection codes configured.
	#[error("At least one anti-forgery rejection code is required.")]
	NoRejectionCodes,
}

/// Builder for [`DispatchConfig`] values.
#[derive(Debug)]
pub struct DispatchConfigBuilder {
	/// Base URL for the configuration being constructed.
	pub base_url: Url,
	/// Anti-forgery settings.
	pub csrf: CsrfSettings,
	/// Auth flow routes.
	pub auth: AuthRoutes,
}
impl DispatchConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and defaults.
	pub fn new(base_url: Url) -> Self {
		Self { base_url, csrf: CsrfSettings::default(), auth: AuthRoutes::default() }
	}

	/// Overrides the anti-forgery issuing endpoint.
	pub fn csrf_endpoint(mut self, path: impl Into<String>) -> Self {
		self.csrf.endpoint = path.into();

		self
	}

	/// Overrides the anti-forgery header name.
	pub fn csrf_header(mut self, name: impl Into<String>) -> Self {
		self.csrf.header = name.into();

		self
	}

	/// Overrides the freshness safety margin (negative values clamp to zero).
	pub fn safety_margin(mut self, margin: Duration) -> Self {
		self.csrf.safety_margin_secs = u64::try_from(margin.whole_seconds()).unwrap_or(0);

		self
	}

	/// Enables or disables single-flight joining of concurrent token fetches.
	pub fn single_flight(mut self, enabled: bool) -> Self {
		self.csrf.single_flight = enabled;

		self
	}

	/// Replaces the set of 403 error codes treated as anti-forgery rejections.
	pub fn rejection_codes<I, S>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.csrf.rejection_codes = codes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the login route.
	pub fn login_route(mut self, path: impl Into<String>) -> Self {
		self.auth.login = path.into();

		self
	}

	/// Overrides the registration route.
	pub fn register_route(mut self, path: impl Into<String>) -> Self {
		self.auth.register = path.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DispatchConfig, DispatchConfigError> {
		let config = DispatchConfig { base_url: self.base_url, csrf: self.csrf, auth: self.auth };

		config.validate()?;

		Ok(config)
	}
}

impl DispatchConfig {
	/// Validates invariants for the configuration.
	pub(crate) fn validate(&self) -> Result<(), DispatchConfigError> {
		validate_base_url(&self.base_url)?;
		validate_route("csrf", &self.csrf.endpoint)?;
		validate_route("login", &self.auth.login)?;
		validate_route("register", &self.auth.register)?;
		validate_header_name(&self.csrf.header)?;

		if self.csrf.rejection_codes.iter().all(|code| code.trim().is_empty()) {
			return Err(DispatchConfigError::NoRejectionCodes);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), DispatchConfigError> {
	if matches!(url.scheme(), "http" | "https") {
		Ok(())
	} else {
		Err(DispatchConfigError::UnsupportedScheme { url: url.to_string() })
	}
}

fn validate_route(route: &'static str, path: &str) -> Result<(), DispatchConfigError> {
	if path.trim().is_empty() { Err(DispatchConfigError::EmptyRoute { route }) } else { Ok(()) }
}

fn validate_header_name(name: &str) -> Result<(), DispatchConfigError> {
	const SEPARATORS: &str = "()<>@,;:\\\"/[]?={} \t";

	let valid = !name.is_empty()
		&& name.chars().all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(c));

	if valid { Ok(()) } else { Err(DispatchConfigError::InvalidHeaderName { name: name.into() }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ConfigError;

	fn base() -> Url {
		Url::parse("https://api.example.com").expect("Failed to parse test base URL.")
	}

	#[test]
	fn defaults_match_service_contract() {
		let config = DispatchConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.csrf.endpoint, "/api/csrf-token");
		assert_eq!(config.csrf.header, "X-CSRF-Token");
		assert_eq!(config.csrf.safety_margin(), Duration::seconds(60));
		assert!(!config.csrf.single_flight);
		assert!(config.csrf.is_rejection_code("CSRF_TOKEN_INVALID"));
		assert!(config.csrf.is_rejection_code("CSRF_TOKEN_MISSING"));
		assert!(!config.csrf.is_rejection_code("FORBIDDEN"));
		assert_eq!(config.auth.login, "/api/auth/login");
		assert_eq!(config.auth.register, "/api/auth/register");
	}

	#[test]
	fn builder_rejects_unusable_values() {
		let err = DispatchConfig::builder(
			Url::parse("ftp://files.example.com").expect("Failed to parse FTP URL."),
		)
		.build()
		.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, DispatchConfigError::UnsupportedScheme { .. }));

		let err = DispatchConfig::builder(
			Url::parse("mailto:ops@example.com").expect("Failed to parse mailto URL."),
		)
		.build()
		.expect_err("Opaque URLs should be rejected.");

		assert!(matches!(err, DispatchConfigError::UnsupportedScheme { .. }));

		let err = DispatchConfig::builder(base())
			.csrf_header("X CSRF")
			.build()
			.expect_err("Header names with spaces should be rejected.");

		assert!(matches!(err, DispatchConfigError::InvalidHeaderName { .. }));

		let err = DispatchConfig::builder(base())
			.login_route("  ")
			.build()
			.expect_err("Blank routes should be rejected.");

		assert_eq!(err, DispatchConfigError::EmptyRoute { route: "login" });

		let err = DispatchConfig::builder(base())
			.rejection_codes(Vec::<String>::new())
			.build()
			.expect_err("An empty rejection set should be rejected.");

		assert_eq!(err, DispatchConfigError::NoRejectionCodes);
	}

	#[test]
	fn negative_safety_margin_clamps_to_zero() {
		let config = DispatchConfig::builder(base())
			.safety_margin(Duration::seconds(-5))
			.build()
			.expect("Clamped margin should validate.");

		assert_eq!(config.csrf.safety_margin(), Duration::ZERO);
	}

	#[test]
	fn json_config_fills_defaults_and_reports_paths() {
		let config = DispatchConfig::from_json(
			r#"{"baseUrl":"http://localhost:3000","csrf":{"header":"X-XSRF-Token","singleFlight":true}}"#,
		)
		.expect("Partial JSON config should load.");

		assert_eq!(config.base_url.as_str(), "http://localhost:3000/");
		assert_eq!(config.csrf.header, "X-XSRF-Token");
		assert!(config.csrf.single_flight);
		assert_eq!(config.csrf.endpoint, "/api/csrf-token");
		assert_eq!(config.auth, AuthRoutes::default());

		let err = DispatchConfig::from_json(
			r#"{"baseUrl":"http://localhost:3000","csrf":{"safetyMarginSecs":"soon"}}"#,
		)
		.expect_err("Wrong field types should be rejected.");

		match err {
			DispatchConfigError::Parse { path, .. } => assert_eq!(path, "csrf.safetyMarginSecs"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn resolve_appends_endpoints_to_base_path() {
		let config = DispatchConfig::builder(
			Url::parse("https://api.example.com/v1/").expect("Failed to parse versioned base URL."),
		)
		.build()
		.expect("Versioned base should validate.");

		assert_eq!(
			config.resolve("lessons/7").expect("Bare path should resolve.").as_str(),
			"https://api.example.com/v1/lessons/7",
		);
		assert_eq!(
			config.resolve("/csrf-token?fresh=1").expect("Rooted path should resolve.").as_str(),
			"https://api.example.com/v1/csrf-token?fresh=1",
		);

		let config = DispatchConfig::builder(
			Url::parse("http://localhost:3000/api").expect("Failed to parse base URL."),
		)
		.build()
		.expect("Base without trailing slash should validate.");

		assert_eq!(
			config.resolve("/lessons").expect("Rooted path should resolve.").as_str(),
			"http://localhost:3000/api/lessons",
		);
	}

	#[test]
	fn resolve_refuses_other_origins() {
		let config = DispatchConfig::builder(base()).build().expect("Defaults should validate.");

		for endpoint in ["https://evil.example/steal", "//evil.example/steal", "mailto:a@b.c"] {
			let err = config.resolve(endpoint).expect_err("Foreign endpoints should be rejected.");

			assert!(
				matches!(err, ConfigError::ForeignEndpoint { .. }),
				"{endpoint} should be rejected as foreign, got {err:?}.",
			);
		}

		let err = config.resolve("http://[::1").expect_err("Malformed URLs should be rejected.");

		assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
		assert_eq!(
			config.resolve("/@evil.example/x").expect("Path text stays on the base.").host_str(),
			Some("api.example.com"),
		);
	}
}
