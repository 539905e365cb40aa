//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_ADMIN, ROLE_OWNER, ROLE_USER};
use crate::errors::{AppError, AppResult};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Owner,
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => ROLE_USER,
            UserRole::Owner => ROLE_OWNER,
            UserRole::Admin => ROLE_ADMIN,
        }
    }

    /// Parse a stored role, rejecting unknown values.
    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            ROLE_USER => Ok(UserRole::User),
            ROLE_OWNER => Ok(UserRole::Owner),
            ROLE_ADMIN => Ok(UserRole::Admin),
            other => Err(AppError::internal(format!("Unknown user role '{}'", other))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with the given role
    pub fn new(email: String, password_hash: String, name: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            role,
            is_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Admin flag
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn update_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn update_role(&mut self, role: UserRole) {
        self.role = role;
        self.updated_at = Utc::now();
    }

    /// Listing a first product turns a plain user into an owner.
    /// Returns true when the role changed.
    pub fn promote_to_owner(&mut self) -> bool {
        if self.role == UserRole::User {
            self.update_role(UserRole::Owner);
            true
        } else {
            false
        }
    }

    pub fn soft_delete(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Identity used for authorization decisions.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
        }
    }
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owner of the resource, or an admin.
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || self.is_admin()
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub name: String,
    pub role: UserRole,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            is_admin: user.is_admin(),
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_verified: user.is_verified,
            created_at: user.created_at,
            deleted_at: user.deleted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User::new("a@b.io".into(), "hash".into(), "A".into(), role)
    }

    #[test]
    fn test_role_round_trip_through_storage_string() {
        for role in [UserRole::User, UserRole::Owner, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()).unwrap(), role);
        }
        assert!(UserRole::parse("superuser").is_err());
    }

    #[test]
    fn test_promote_only_plain_users() {
        let mut plain = user(UserRole::User);
        assert!(plain.promote_to_owner());
        assert_eq!(plain.role, UserRole::Owner);
        assert!(!plain.promote_to_owner());

        let mut admin = user(UserRole::Admin);
        assert!(!admin.promote_to_owner());
        assert_eq!(admin.role, UserRole::Admin);
    }

    #[test]
    fn test_actor_can_manage() {
        let owner = Uuid::new_v4();
        assert!(Actor::new(owner, UserRole::Owner).can_manage(owner));
        assert!(!Actor::new(Uuid::new_v4(), UserRole::Owner).can_manage(owner));
        assert!(Actor::new(Uuid::new_v4(), UserRole::Admin).can_manage(owner));
    }

    #[test]
    fn test_response_hides_password_hash() {
        let json = serde_json::to_string(&UserResponse::from(user(UserRole::User))).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("\"is_admin\":false"));
    }
}
