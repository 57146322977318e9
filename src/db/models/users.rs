//! Database models for users.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;

use crate::types::UserId;

/// Database request for creating a new user. The password arrives already
/// hashed; plaintext never reaches the database layer.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub company: String,
    pub email: String,
    pub password_hash: String,
    pub admin: bool,
}

/// Database request for updating a user. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub company: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub admin: Option<bool>,
}

/// Database response for a user.
///
/// Carries the password hash because credential checks need it; it must be
/// stripped before any external exposure (the API response types never
/// serialize it).
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub company: String,
    pub email: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
    pub password: Option<String>,
}
