//! API request/response models for simulation configurations.
//!
//! Settings travel over the wire as a JSON object (the nested
//! unit-type -> unit-id -> parameter graph) but are stored as a
//! JSON-serialized string column; the mapping happens here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::db::models::simulations::{SimulationDBResponse, SimulationSummaryDBResponse, SimulationWithOwnerDBResponse};
use crate::types::{SimulationId, UserId};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulationCreate {
    pub name: Option<String>,
    /// Either a JSON object or an already-serialized JSON string.
    pub settings: Value,
}

#[derive(Debug, Clone, Deserialize, Default, ToSchema)]
pub struct SimulationUpdate {
    pub name: Option<String>,
    pub settings: Option<Value>,
}

/// Result attachment from the external processing service.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulationResultsUpdate {
    pub results: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SimulationResponse {
    pub id: SimulationId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub name: Option<String>,
    pub settings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<SimulationDBResponse> for SimulationResponse {
    fn from(db: SimulationDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            email: None,
            name: db.name,
            settings: db.settings,
            results: db.results,
            created_at: db.created_at,
            updated_at: Some(db.updated_at),
        }
    }
}

impl From<SimulationSummaryDBResponse> for SimulationResponse {
    fn from(db: SimulationSummaryDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            email: None,
            name: db.name,
            settings: db.settings,
            results: None,
            created_at: db.created_at,
            updated_at: None,
        }
    }
}

impl From<SimulationWithOwnerDBResponse> for SimulationResponse {
    fn from(db: SimulationWithOwnerDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            email: Some(db.email),
            name: db.name,
            settings: db.settings,
            results: db.results,
            created_at: db.created_at,
            updated_at: Some(db.updated_at),
        }
    }
}

/// Normalize incoming settings/results payloads to their stored string form.
pub fn value_to_stored_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
