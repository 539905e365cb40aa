//! Pending admin actions awaiting re-authentication and a one-time code.

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::CONFIRMATION_CODE_LENGTH;

/// Privilege-altering or destructive admin actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    GrantAdmin,
    RevokeAdmin,
    DeleteUser,
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AdminAction::GrantAdmin => "grant_admin",
            AdminAction::RevokeAdmin => "revoke_admin",
            AdminAction::DeleteUser => "delete_user",
        };
        f.write_str(name)
    }
}

/// Where a pending confirmation lives: one admin, one login session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub admin_id: Uuid,
    pub session_id: Uuid,
}

impl SessionKey {
    pub fn new(admin_id: Uuid, session_id: Uuid) -> Self {
        Self {
            admin_id,
            session_id,
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.admin_id, self.session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub action: AdminAction,
    pub target_user_id: Uuid,
    pub code: String,
    pub failed_attempts: u32,
    pub expires_at: DateTime<Utc>,
}

impl PendingConfirmation {
    pub fn new(action: AdminAction, target_user_id: Uuid, ttl_seconds: u64) -> Self {
        Self {
            action,
            target_user_id,
            code: generate_code(),
            failed_attempts: 0,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Exact, case-sensitive comparison.
    pub fn code_matches(&self, entered: &str) -> bool {
        self.code == entered
    }

    /// Same action on the same user, issued under the same code.
    pub fn is_same_request(&self, other: &PendingConfirmation) -> bool {
        self.action == other.action
            && self.target_user_id == other.target_user_id
            && self.code == other.code
    }

    /// Seconds until expiry, at least one.
    pub fn remaining_seconds(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(1) as u64
    }
}

/// Six characters drawn uniformly from `[A-Za-z0-9]` with the OS RNG.
pub fn generate_code() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_shape() {
        let code = generate_code();
        assert_eq!(code.len(), CONFIRMATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_codes_vary() {
        let codes: HashSet<String> = (0..50).map(|_| generate_code()).collect();
        assert!(codes.len() > 45);
    }

    #[test]
    fn test_code_comparison_is_case_sensitive() {
        let mut pending = PendingConfirmation::new(AdminAction::GrantAdmin, Uuid::new_v4(), 60);
        pending.code = "aB3xY9".into();

        assert!(pending.code_matches("aB3xY9"));
        assert!(!pending.code_matches("AB3XY9"));
        assert!(!pending.code_matches("aB3xY"));
    }

    #[test]
    fn test_expiry() {
        let mut pending = PendingConfirmation::new(AdminAction::DeleteUser, Uuid::new_v4(), 60);
        assert!(!pending.is_expired());
        pending.expires_at = Utc::now() - Duration::seconds(1);
        assert!(pending.is_expired());
    }

    #[test]
    fn test_same_request_ignores_attempt_count() {
        let original = PendingConfirmation::new(AdminAction::GrantAdmin, Uuid::new_v4(), 60);
        let mut retried = original.clone();
        retried.failed_attempts = 2;
        assert!(retried.is_same_request(&original));

        let reissued = PendingConfirmation {
            code: generate_code(),
            ..original.clone()
        };
        if reissued.code != original.code {
            assert!(!reissued.is_same_request(&original));
        }

        let other_user = PendingConfirmation::new(AdminAction::GrantAdmin, Uuid::new_v4(), 60);
        assert!(!other_user.is_same_request(&original));
    }
}
