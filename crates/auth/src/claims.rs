use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::RoleCode;

/// Default lifetime of the persisted authentication marker.
pub const DEFAULT_MARKER_TTL_DAYS: i64 = 7;

/// Short-lived authentication marker persisted on the client.
///
/// It only records *that* a session exists and which role it was opened with
/// (for routing before the principal is re-fetched). It grants nothing by
/// itself: decisions are made on the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMarker {
    pub role_code: RoleCode,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthMarker {
    pub fn issue(role_code: RoleCode, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            role_code,
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkerValidationError {
    #[error("marker has expired")]
    Expired,

    #[error("marker not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid marker time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a marker against `now`.
pub fn validate_marker(marker: &AuthMarker, now: DateTime<Utc>) -> Result<(), MarkerValidationError> {
    if marker.expires_at <= marker.issued_at {
        return Err(MarkerValidationError::InvalidTimeWindow);
    }
    if now < marker.issued_at {
        return Err(MarkerValidationError::NotYetValid);
    }
    if now >= marker.expires_at {
        return Err(MarkerValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(now: DateTime<Utc>) -> AuthMarker {
        AuthMarker::issue(RoleCode::SCHOOL_ADMIN, now, Duration::days(DEFAULT_MARKER_TTL_DAYS))
    }

    #[test]
    fn valid_within_window() {
        let now = Utc::now();
        assert_eq!(validate_marker(&marker(now), now + Duration::days(6)), Ok(()));
    }

    #[test]
    fn expires_after_seven_days() {
        let now = Utc::now();
        assert_eq!(
            validate_marker(&marker(now), now + Duration::days(7)),
            Err(MarkerValidationError::Expired)
        );
    }

    #[test]
    fn rejects_future_and_inverted_markers() {
        let now = Utc::now();
        assert_eq!(
            validate_marker(&marker(now), now - Duration::seconds(1)),
            Err(MarkerValidationError::NotYetValid)
        );

        let inverted = AuthMarker::issue(RoleCode::SCHOOL_ADMIN, now, Duration::zero());
        assert_eq!(validate_marker(&inverted, now), Err(MarkerValidationError::InvalidTimeWindow));
    }

    #[test]
    fn serializes_role_code_as_string() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let json = serde_json::to_string(&marker(now)).unwrap();
        assert!(json.contains(r#""role_code":"SCHOOL_ADMIN""#));
        let back: AuthMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, marker(now));
    }
}
