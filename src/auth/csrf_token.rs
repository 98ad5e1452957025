//! Anti-forgery token value plus its freshness rules.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Server-issued anti-forgery token held by [`CsrfTokenCache`](crate::csrf::CsrfTokenCache).
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken {
	/// Token value attached to mutating requests.
	pub value: TokenSecret,
	/// Server-declared expiry instant.
	pub expires_at: OffsetDateTime,
}
impl CsrfToken {
	/// Builds a token that expires `expires_in` after `issued_at`.
	pub fn issued(
		value: impl Into<TokenSecret>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self { value: value.into(), expires_at: issued_at + expires_in }
	}

	/// Returns `true` while `instant < expires_at - safety_margin`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, safety_margin: Duration) -> bool {
		instant < self.expires_at - safety_margin
	}

	/// Remaining lifetime relative to `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for CsrfToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CsrfToken")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const MARGIN: Duration = Duration::seconds(60);

	#[test]
	fn freshness_applies_safety_margin_once() {
		let issued_at = datetime!(2025-01-01 00:00 UTC);
		let token = CsrfToken::issued("T1", issued_at, Duration::seconds(300));

		assert!(token.is_fresh_at(issued_at + Duration::seconds(100), MARGIN));
		assert!(token.is_fresh_at(issued_at + Duration::seconds(239), MARGIN));
		assert!(!token.is_fresh_at(issued_at + Duration::seconds(240), MARGIN));
		assert!(!token.is_fresh_at(issued_at + Duration::seconds(250), MARGIN));
	}

	#[test]
	fn remaining_lifetime_never_goes_negative() {
		let issued_at = datetime!(2025-01-01 00:00 UTC);
		let token = CsrfToken::issued("T1", issued_at, Duration::seconds(30));

		assert_eq!(token.remaining_at(issued_at + Duration::seconds(10)), Duration::seconds(20));
		assert_eq!(token.remaining_at(issued_at + Duration::seconds(90)), Duration::ZERO);
	}

	#[test]
	fn debug_output_redacts_value() {
		let token =
			CsrfToken::issued("secret-value", datetime!(2025-01-01 00:00 UTC), Duration::MINUTE);

		assert!(!format!("{token:?}").contains("secret-value"));
	}
}
