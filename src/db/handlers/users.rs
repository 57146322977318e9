//! Database repository for users.

use serde_json::{Value, json};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    store::{Record, RecordStore, TableSpec, from_record},
};
use crate::types::UserId;

// The readable list carries the password hash for credential checks; callers
// strip it before anything leaves the service.
static USERS: TableSpec = TableSpec {
    table: "users",
    readable: &["id", "company", "email", "password", "admin", "created_at"],
    writable: &["id", "company", "email", "password", "admin"],
};

pub struct Users<'c> {
    store: RecordStore<'c>,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            store: RecordStore::new(db, &USERS),
        }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let mut criteria = Record::new();
        criteria.insert("email".to_string(), Value::String(email.to_string()));

        let rows = self.store.find(&criteria, Some(1)).await?;
        rows.into_iter().next().map(from_record).transpose()
    }

    /// All non-admin users, password hash omitted at the query level.
    #[instrument(skip(self), err)]
    pub async fn get_all_non_admin_users(&mut self) -> Result<Vec<UserDBResponse>> {
        let users = sqlx::query_as::<_, UserDBResponse>(
            "SELECT id, company, email, admin, created_at, NULL::text AS password
             FROM users WHERE admin = FALSE ORDER BY id",
        )
        .fetch_all(&mut *self.store.connection())
        .await?;

        Ok(users)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let record = match json!({
            "company": request.company,
            "email": request.email,
            "password": request.password_hash,
            "admin": request.admin,
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let created = self.store.create(&record).await?;
        self.get_by_id(created.insert_id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: UserId) -> Result<Option<Self::Response>> {
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
    async fn update(&mut self, id: UserId, request: &Self::UpdateRequest) -> Result<u64> {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(id));
        if let Some(company) = &request.company {
            record.insert("company".to_string(), json!(company));
        }
        if let Some(email) = &request.email {
            record.insert("email".to_string(), json!(email));
        }
        if let Some(password_hash) = &request.password_hash {
            record.insert("password".to_string(), json!(password_hash));
        }
        if let Some(admin) = request.admin {
            record.insert("admin".to_string(), json!(admin));
        }

        self.store.update(&record).await
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: UserId) -> Result<u64> {
        self.store.delete(id).await
    }
}
