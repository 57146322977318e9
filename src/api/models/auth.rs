//! API models for authentication.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::UserId;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login: a signed bearer token with `{id, admin, email}` claims.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Decoded claims returned by the token check endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenCheckResponse {
    pub id: UserId,
    pub admin: bool,
    pub email: String,
}
