//! API request/response models for users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;

// User request models
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserCreate {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub admin: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default, ToSchema)]
pub struct UserUpdate {
    pub company: Option<String>,
    pub email: Option<String>,
    /// Empty string means "keep the current password" (the edit form echoes
    /// an empty field back).
    pub password: Option<String>,
    pub admin: Option<bool>,
}

/// User response with the password hash stripped. Pruning sensitive columns
/// before the response is the handler layer's job, and this type is how it
/// is enforced: there is no password field to leak.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub company: String,
    pub email: String,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            company: db.company,
            email: db.email,
            admin: db.admin,
            created_at: db.created_at,
        }
    }
}

/// The authenticated caller, as carried in the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: UserId,
    pub admin: bool,
    pub email: String,
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            admin: db.admin,
            email: db.email,
        }
    }
}
