//! Database models for studies.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::types::StudyId;

/// Database request for creating a study.
#[derive(Debug, Clone)]
pub struct StudyCreateDBRequest {
    pub study_name: String,
    pub settings: Option<String>,
}

/// Database request for updating a study.
#[derive(Debug, Clone, Default)]
pub struct StudyUpdateDBRequest {
    pub study_name: Option<String>,
    pub settings: Option<String>,
}

/// Database response for a study.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyDBResponse {
    pub id: StudyId,
    pub study_name: String,
    pub settings: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
