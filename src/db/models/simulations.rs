//! Database models for simulation configurations.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;

use crate::types::{SimulationId, UserId};

/// Database request for persisting a new simulation configuration.
/// `settings` is the JSON-serialized unit-type -> unit-id -> parameter graph.
#[derive(Debug, Clone)]
pub struct SimulationCreateDBRequest {
    pub user_id: UserId,
    pub name: Option<String>,
    pub settings: String,
}

/// Database request for updating a simulation. `None` fields are left
/// untouched; `results` is attached by the external processing callback.
#[derive(Debug, Clone, Default)]
pub struct SimulationUpdateDBRequest {
    pub name: Option<String>,
    pub settings: Option<String>,
    pub results: Option<String>,
}

/// Full database response for a simulation configuration.
#[derive(Debug, Clone, Deserialize, FromRow)]
pub struct SimulationDBResponse {
    pub id: SimulationId,
    pub user_id: UserId,
    pub name: Option<String>,
    pub settings: String,
    pub results: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trimmed row for "last N for user" listings; the results blob is heavy and
/// deliberately not selected.
#[derive(Debug, Clone, FromRow)]
pub struct SimulationSummaryDBResponse {
    pub id: SimulationId,
    pub user_id: UserId,
    pub name: Option<String>,
    pub settings: String,
    pub created_at: DateTime<Utc>,
}

/// Paginated row joined with the owning user's email.
#[derive(Debug, Clone, FromRow)]
pub struct SimulationWithOwnerDBResponse {
    pub id: SimulationId,
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub settings: String,
    pub results: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
