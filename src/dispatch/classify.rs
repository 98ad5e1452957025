//! Response classification.
//!
//! Rules are evaluated in a fixed order: 429, then 403 carrying an anti-forgery code, then any
//! other non-success status, then success.

// self
use crate::{
	_prelude::*,
	config::CsrfSettings,
	http::{HttpResponse, parse_retry_after},
};

/// Structured error body returned by the service.
#[derive(Clone, Debug, Default, Deserialize)]
struct ErrorBody {
	code: Option<String>,
	message: Option<String>,
	error: Option<String>,
}
impl ErrorBody {
	fn parse(body: &[u8]) -> Option<Self> {
		serde_json::from_slice(body).ok()
	}

	fn into_message(self) -> Option<String> {
		self.message.or(self.error).filter(|message| !message.trim().is_empty())
	}
}

/// Classification of a single response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseClass {
	/// 2xx; the body is ready for decoding.
	Success {
		/// HTTP status code.
		status: u16,
	},
	/// HTTP 429.
	RateLimited {
		/// Wait hint from `Retry-After`, if one could be parsed.
		retry_after_seconds: Option<u64>,
	},
	/// HTTP 403 with a configured anti-forgery rejection code.
	CsrfRejected {
		/// Code returned by the service.
		code: String,
	},
	/// Any other non-success status.
	Failed {
		/// Service message, or a generic fallback.
		message: String,
		/// HTTP status code.
		status: u16,
	},
}
impl ResponseClass {
	/// Converts failure classes into their [`Error`] counterparts.
	pub fn into_error(self) -> Option<Error> {
		match self {
			Self::Success { .. } => None,
			Self::RateLimited { retry_after_seconds } =>
				Some(Error::RateLimited { retry_after_seconds }),
			Self::CsrfRejected { code } => Some(Error::CsrfRejected { code }),
			Self::Failed { message, status } => Some(Error::RequestFailed { message, status }),
		}
	}
}

/// Classifies `response`; `now` anchors HTTP-date `Retry-After` values.
pub fn classify(
	response: &HttpResponse,
	csrf: &CsrfSettings,
	now: OffsetDateTime,
) -> ResponseClass {
	let status = response.status;

	if status == 429 {
		let retry_after_seconds =
			response.header("retry-after").and_then(|raw| parse_retry_after(raw, now));

		return ResponseClass::RateLimited { retry_after_seconds };
	}

	let body = ErrorBody::parse(&response.body);

	if status == 403 {
		let rejection = body.as_ref().and_then(|body| body.code.as_deref()).filter(|code| {
			csrf.is_rejection_code(code)
		});

		if let Some(code) = rejection {
			return ResponseClass::CsrfRejected { code: code.to_owned() };
		}
	}
	if !response.is_success() {
		let message = body
			.and_then(ErrorBody::into_message)
			.unwrap_or_else(|| generic_message(status));

		return ResponseClass::Failed { message, status };
	}

	ResponseClass::Success { status }
}

fn generic_message(status: u16) -> String {
	format!("Service responded with HTTP {status} and no usable error message.")
}
