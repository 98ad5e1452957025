//! Dispatch-level error types shared across the dispatcher, token cache, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical dispatch error exposed by public APIs.
///
/// Every failure reaches the caller as one of these variants. The only recovery performed
/// internally is clearing the anti-forgery cache before [`Error::CsrfRejected`] is returned.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on the main call.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The anti-forgery token could not be obtained; the request was not sent.
	#[error("Anti-forgery token could not be issued: {0}")]
	IssuanceFailed(
		#[from]
		#[source]
		IssuanceError,
	),

	/// Request body could not be encoded as JSON.
	#[error("Request body could not be serialized.")]
	Serialize {
		/// Underlying encoder failure.
		#[source]
		source: serde_json::Error,
	},
	/// Service answered with HTTP 429.
	#[error("Request was rate limited; {}.", describe_retry_after(.retry_after_seconds))]
	RateLimited {
		/// Wait hint parsed from `Retry-After`; `None` when absent or unparsable.
		retry_after_seconds: Option<u64>,
	},
	/// Service rejected the anti-forgery token. The cache has already been cleared.
	#[error("Service rejected the anti-forgery token ({code}).")]
	CsrfRejected {
		/// Structured error code returned by the service.
		code: String,
	},
	/// Any other non-success response, or a success payload that failed to decode.
	#[error("Request failed with HTTP {status}: {message}")]
	RequestFailed {
		/// Service- or dispatcher-supplied message.
		message: String,
		/// HTTP status code of the response.
		status: u16,
	},
}
impl Error {
	/// Returns the HTTP status tied to the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::RateLimited { .. } => Some(429),
			Self::CsrfRejected { .. } => Some(403),
			Self::RequestFailed { status, .. } => Some(*status),
			Self::IssuanceFailed(IssuanceError::Status { status })
			| Self::IssuanceFailed(IssuanceError::Parse { status, .. }) => Some(*status),
			_ => None,
		}
	}

	/// Returns the rate-limit wait hint carried by [`Error::RateLimited`].
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::RateLimited { retry_after_seconds: Some(secs) } =>
				Some(Duration::seconds(i64::try_from(*secs).unwrap_or(i64::MAX))),
			_ => None,
		}
	}
}

fn describe_retry_after(retry_after_seconds: &Option<u64>) -> String {
	match retry_after_seconds {
		Some(secs) => format!("retry after {secs} seconds"),
		None => "no retry hint was supplied".into(),
	}
}

/// Configuration failures raised while building or using the dispatcher.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint cannot be resolved against the configured base URL.
	#[error("Endpoint `{endpoint}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Endpoint string supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint names another origin; credentials are never sent off the base URL.
	#[error("Endpoint `{endpoint}` points outside the configured base URL.")]
	ForeignEndpoint {
		/// Endpoint string supplied by the caller.
		endpoint: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Reasons an anti-forgery token fetch failed.
#[derive(Debug, ThisError)]
pub enum IssuanceError {
	/// Issuing endpoint answered with a non-success status.
	#[error("Issuing endpoint returned HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// Issuing endpoint could not be reached.
	#[error("Issuing endpoint could not be reached.")]
	Transport {
		/// Transport failure.
		#[source]
		source: TransportError,
	},
	/// Issuing endpoint responded with malformed JSON.
	#[error("Issuing endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Issuing endpoint returned an empty token value.
	#[error("Issuing endpoint returned an empty token.")]
	EmptyToken,
	/// Issuing endpoint returned a non-positive lifetime.
	#[error("The expiresIn value must be positive.")]
	NonPositiveExpiresIn,
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rate_limited_reports_missing_hint_without_defaulting() {
		let err = Error::RateLimited { retry_after_seconds: None };

		assert_eq!(err.retry_after(), None);
		assert_eq!(err.status(), Some(429));
		assert!(err.to_string().contains("no retry hint"));

		let err = Error::RateLimited { retry_after_seconds: Some(30) };

		assert_eq!(err.retry_after(), Some(Duration::seconds(30)));
		assert!(err.to_string().contains("retry after 30 seconds"));
	}

	#[test]
	fn issuance_failure_exposes_source_and_status() {
		let err: Error = IssuanceError::Status { status: 502 }.into();

		assert_eq!(err.status(), Some(502));

		let source = StdError::source(&err)
			.expect("Issuance failure should expose the underlying issuance error.");

		assert_eq!(source.to_string(), "Issuing endpoint returned HTTP 502.");
	}

	#[test]
	fn transport_failures_carry_no_status() {
		let err: Error = TransportError::Io(std::io::Error::other("socket closed")).into();

		assert_eq!(err.status(), None);
		assert_eq!(err.retry_after(), None);
	}
}
