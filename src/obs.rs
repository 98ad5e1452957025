//! Optional observability helpers for dispatcher operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `secure_dispatch.request` with the
//!   `operation` and `stage` (call site) fields.
//! - Enable `metrics` to increment the `secure_dispatch_request_total` counter for every
//!   attempt/outcome, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Generic `dispatch` call.
	Dispatch,
	/// Anti-forgery token fetch.
	CsrfIssuance,
	/// Login helper.
	Login,
	/// Registration helper.
	Register,
	/// Logout helper.
	Logout,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Dispatch => "dispatch",
			OperationKind::CsrfIssuance => "csrf_issuance",
			OperationKind::Login => "login",
			OperationKind::Register => "register",
			OperationKind::Logout => "logout",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Service answered with HTTP 429.
	RateLimited,
	/// Service rejected the anti-forgery token.
	CsrfRejected,
	/// Any other failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::RateLimited => "rate_limited",
			Outcome::CsrfRejected => "csrf_rejected",
			Outcome::Failure => "failure",
		}
	}

	/// Maps an operation result onto its outcome label.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => Outcome::Success,
			Err(Error::RateLimited { .. }) => Outcome::RateLimited,
			Err(Error::CsrfRejected { .. }) => Outcome::CsrfRejected,
			Err(_) => Outcome::Failure,
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
