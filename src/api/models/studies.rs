//! API request/response models for studies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::studies::StudyDBResponse;
use crate::types::StudyId;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudyCreate {
    pub study_name: Option<String>,
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, ToSchema)]
pub struct StudyUpdate {
    pub study_name: Option<String>,
    pub settings: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudyResponse {
    pub id: StudyId,
    pub study_name: String,
    pub settings: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StudyDBResponse> for StudyResponse {
    fn from(db: StudyDBResponse) -> Self {
        Self {
            id: db.id,
            study_name: db.study_name,
            settings: db.settings,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}
