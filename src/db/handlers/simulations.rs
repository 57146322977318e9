//! Database repository for simulation configurations.

use serde_json::{Value, json};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::simulations::{
        SimulationCreateDBRequest, SimulationDBResponse, SimulationSummaryDBResponse, SimulationUpdateDBRequest,
        SimulationWithOwnerDBResponse,
    },
    store::{Record, RecordStore, TableSpec, from_record},
};
use crate::types::{SimulationId, UserId};

static SIMULATIONS: TableSpec = TableSpec {
    table: "simulations",
    readable: &["id", "user_id", "name", "settings", "results", "created_at", "updated_at"],
    writable: &["id", "user_id", "name", "settings", "results"],
};

pub struct Simulations<'c> {
    store: RecordStore<'c>,
}

impl<'c> Simulations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            store: RecordStore::new(db, &SIMULATIONS),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn all_for_user(&mut self, user_id: UserId) -> Result<Vec<SimulationDBResponse>> {
        let mut criteria = Record::new();
        criteria.insert("user_id".to_string(), json!(user_id));

        let rows = self.store.find(&criteria, None).await?;
        rows.into_iter().map(from_record).collect()
    }

    /// The most recent configurations for a user, results blob not selected.
    #[instrument(skip(self), err)]
    pub async fn last_for_user(&mut self, user_id: UserId, limit: i64) -> Result<Vec<SimulationSummaryDBResponse>> {
        let rows = sqlx::query_as::<_, SimulationSummaryDBResponse>(
            "SELECT id, user_id, name, settings, created_at
             FROM simulations WHERE user_id = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *self.store.connection())
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self), err)]
    pub async fn latest_for_user(&mut self, user_id: UserId) -> Result<Option<SimulationDBResponse>> {
        let row = sqlx::query_as::<_, SimulationDBResponse>(
            "SELECT id, user_id, name, settings, results, created_at, updated_at
             FROM simulations WHERE user_id = $1
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.store.connection())
        .await?;

        Ok(row)
    }

    #[instrument(skip(self), err)]
    pub async fn for_user_by_id(&mut self, user_id: UserId, simulation_id: SimulationId) -> Result<Option<SimulationDBResponse>> {
        let row = sqlx::query_as::<_, SimulationDBResponse>(
            "SELECT id, user_id, name, settings, results, created_at, updated_at
             FROM simulations WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(simulation_id)
        .fetch_optional(&mut *self.store.connection())
        .await?;

        Ok(row)
    }

    /// One page of a user's configurations joined with the owner's email,
    /// newest first, plus the total count for the pager.
    #[instrument(skip(self), err)]
    pub async fn all_for_user_paginated(
        &mut self,
        user_id: UserId,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<SimulationWithOwnerDBResponse>, i64)> {
        let offset = (page - 1).max(0) * limit;

        let rows = sqlx::query_as::<_, SimulationWithOwnerDBResponse>(
            "SELECT s.id, s.user_id, u.email, s.name, s.settings, s.results, s.created_at, s.updated_at
             FROM simulations s
             JOIN users u ON u.id = s.user_id
             WHERE s.user_id = $1
             ORDER BY s.updated_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.store.connection())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM simulations WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.store.connection())
            .await?;

        Ok((rows, total))
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Simulations<'c> {
    type CreateRequest = SimulationCreateDBRequest;
    type UpdateRequest = SimulationUpdateDBRequest;
    type Response = SimulationDBResponse;

    #[instrument(skip(self, request), fields(user_id = request.user_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut record = Record::new();
        record.insert("user_id".to_string(), json!(request.user_id));
        if let Some(name) = &request.name {
            record.insert("name".to_string(), json!(name));
        }
        record.insert("settings".to_string(), Value::String(request.settings.clone()));

        let created = self.store.create(&record).await?;
        self.get_by_id(created.insert_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: SimulationId) -> Result<Option<Self::Response>> {
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
    async fn update(&mut self, id: SimulationId, request: &Self::UpdateRequest) -> Result<u64> {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        if let Some(name) = &request.name {
            record.insert("name".to_string(), json!(name));
        }
        if let Some(settings) = &request.settings {
            record.insert("settings".to_string(), json!(settings));
        }
        if let Some(results) = &request.results {
            record.insert("results".to_string(), json!(results));
        }

        self.store.update(&record).await
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: SimulationId) -> Result<u64> {
        self.store.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::users::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::PgPool;

    async fn seed_user(conn: &mut PgConnection, email: &str) -> UserId {
        let mut users = Users::new(conn);
        users
            .create(&UserCreateDBRequest {
                company: "AIT".to_string(),
                email: email.to_string(),
                password_hash: "$argon2id$fake-hash".to_string(),
                admin: false,
            })
            .await
            .unwrap()
            .id
    }

    fn settings_fixture() -> String {
        serde_json::json!({
            "energy_sources": {
                "es_1": {"param": [{"integrate": true, "power": 40.0}]}
            },
            "energy_storages": {
                "st_1": {"param": [{"integrate": false, "capacity": 120.0}]}
            }
        })
        .to_string()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_then_find_round_trips_settings(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "sim@example.com").await;
        let mut repo = Simulations::new(&mut conn);

        let created = repo
            .create(&SimulationCreateDBRequest {
                user_id,
                name: Some("A".to_string()),
                settings: settings_fixture(),
            })
            .await
            .unwrap();

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name.as_deref(), Some("A"));
        let submitted: serde_json::Value = serde_json::from_str(&settings_fixture()).unwrap();
        let stored: serde_json::Value = serde_json::from_str(&fetched.settings).unwrap();
        assert_eq!(stored, submitted);
        assert!(fetched.results.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_last_for_user_orders_newest_first(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "order@example.com").await;
        let mut repo = Simulations::new(&mut conn);

        for name in ["first", "second", "third"] {
            repo.create(&SimulationCreateDBRequest {
                user_id,
                name: Some(name.to_string()),
                settings: "{}".to_string(),
            })
            .await
            .unwrap();
            // created_at has second precision ties broken by insertion; spread them out
            sqlx::query("UPDATE simulations SET created_at = created_at - interval '1 minute' WHERE name != $1")
                .bind(name)
                .execute(&mut *conn)
                .await
                .unwrap();
            repo = Simulations::new(&mut conn);
        }

        let last_two = repo.last_for_user(user_id, 2).await.unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].name.as_deref(), Some("third"));
        assert_eq!(last_two[1].name.as_deref(), Some("second"));

        let latest = repo.latest_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(latest.name.as_deref(), Some("third"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_results_attach_and_scoped_lookup(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "results@example.com").await;
        let other_id = seed_user(&mut conn, "other@example.com").await;
        let mut repo = Simulations::new(&mut conn);

        let created = repo
            .create(&SimulationCreateDBRequest {
                user_id,
                name: Some("run".to_string()),
                settings: "{}".to_string(),
            })
            .await
            .unwrap();

        let affected = repo
            .update(
                created.id,
                &SimulationUpdateDBRequest {
                    results: Some("{\"objective\": 42.0}".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let scoped = repo.for_user_by_id(user_id, created.id).await.unwrap().unwrap();
        assert_eq!(scoped.results.as_deref(), Some("{\"objective\": 42.0}"));

        // The same id under another user's scope matches nothing.
        let foreign = repo.for_user_by_id(other_id, created.id).await.unwrap();
        assert!(foreign.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pagination_counts_and_pages(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "pages@example.com").await;
        let mut repo = Simulations::new(&mut conn);

        for i in 0..5 {
            repo.create(&SimulationCreateDBRequest {
                user_id,
                name: Some(format!("cfg-{i}")),
                settings: "{}".to_string(),
            })
            .await
            .unwrap();
        }

        let (page_one, total) = repo.all_for_user_paginated(user_id, 1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page_one.len(), 2);
        assert_eq!(page_one[0].email, "pages@example.com");

        let (page_three, _) = repo.all_for_user_paginated(user_id, 3, 2).await.unwrap();
        assert_eq!(page_three.len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_null_criterion_matches_unprocessed_rows(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "pending@example.com").await;
        let mut repo = Simulations::new(&mut conn);

        let pending = repo
            .create(&SimulationCreateDBRequest {
                user_id,
                name: Some("pending".to_string()),
                settings: "{}".to_string(),
            })
            .await
            .unwrap();
        let processed = repo
            .create(&SimulationCreateDBRequest {
                user_id,
                name: Some("processed".to_string()),
                settings: "{}".to_string(),
            })
            .await
            .unwrap();
        repo.update(
            processed.id,
            &SimulationUpdateDBRequest {
                results: Some("{}".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // A null criterion becomes IS NULL; plain equality would match nothing.
        let mut store = RecordStore::new(&mut conn, &SIMULATIONS);
        let criteria = match json!({"user_id": user_id, "results": null}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let rows = store.find(&criteria, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(pending.id));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_rogue_write_key_is_rejected(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user_id = seed_user(&mut conn, "rogue@example.com").await;
        let mut store = RecordStore::new(&mut conn, &SIMULATIONS);

        // A payload spread straight from a request body with an extra key
        // must fail closed, not write a partial row.
        let payload = match json!({
            "user_id": user_id,
            "settings": "{}",
            "created_at": "2020-01-01T00:00:00Z",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let result = store.create(&payload).await;
        assert!(matches!(result, Err(DbError::UnknownColumn { column, .. }) if column == "created_at"));

        let mut repo = Simulations::new(&mut conn);
        assert!(repo.all_for_user(user_id).await.unwrap().is_empty());
    }
}
