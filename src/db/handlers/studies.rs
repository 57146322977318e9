//! Database repository for studies.

use serde_json::{Value, json};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::studies::{StudyCreateDBRequest, StudyDBResponse, StudyUpdateDBRequest},
    store::{Record, RecordStore, TableSpec, from_record},
};
use crate::types::StudyId;

static STUDIES: TableSpec = TableSpec {
    table: "studies",
    readable: &["id", "study_name", "settings", "created_at", "updated_at"],
    writable: &["id", "study_name", "settings"],
};

pub struct Studies<'c> {
    store: RecordStore<'c>,
}

impl<'c> Studies<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            store: RecordStore::new(db, &STUDIES),
        }
    }

    #[instrument(skip(self, study_name), err)]
    pub async fn find_by_name(&mut self, study_name: &str) -> Result<Option<StudyDBResponse>> {
        let mut criteria = Record::new();
        criteria.insert("study_name".to_string(), Value::String(study_name.to_string()));

        let rows = self.store.find(&criteria, Some(1)).await?;
        rows.into_iter().next().map(from_record).transpose()
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Studies<'c> {
    type CreateRequest = StudyCreateDBRequest;
    type UpdateRequest = StudyUpdateDBRequest;
    type Response = StudyDBResponse;

    #[instrument(skip(self, request), fields(study_name = %request.study_name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut record = Record::new();
        record.insert("study_name".to_string(), json!(request.study_name));
        if let Some(settings) = &request.settings {
            record.insert("settings".to_string(), json!(settings));
        }

        let created = self.store.create(&record).await?;
        self.get_by_id(created.insert_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: StudyId) -> Result<Option<Self::Response>> {
        let mut criteria = Record::new();
        criteria.insert("id".to_string(), json!(id));

        let rows = self.store.find(&criteria, Some(1)).await?;
        rows.into_iter().next().map(from_record).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self) -> Result<Vec<Self::Response>> {
        let rows = self.store.all().await?;
        rows.into_iter().map(from_record).collect()
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: StudyId, request: &Self::UpdateRequest) -> Result<u64> {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        if let Some(study_name) = &request.study_name {
            record.insert("study_name".to_string(), json!(study_name));
        }
        if let Some(settings) = &request.settings {
            record.insert("settings".to_string(), json!(settings));
        }

        self.store.update(&record).await
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: StudyId) -> Result<u64> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_study_crud_cycle(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Studies::new(&mut conn);

        let created = repo
            .create(&StudyCreateDBRequest {
                study_name: "baseline".to_string(),
                settings: Some("{\"horizon\": 8760}".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(created.study_name, "baseline");

        let found = repo.find_by_name("baseline").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let affected = repo
            .update(
                created.id,
                &StudyUpdateDBRequest {
                    study_name: Some("baseline-v2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        assert_eq!(repo.delete(created.id).await.unwrap(), 1);
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_find_by_unknown_name_is_empty(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Studies::new(&mut conn);
        assert!(repo.find_by_name("missing").await.unwrap().is_none());
    }
}
