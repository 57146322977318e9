//! Base repository trait for database operations.

use crate::db::errors::Result;

/// Base repository trait providing common database operations.
///
/// A repository is the data access layer for one table: a [`crate::db::store::RecordStore`]
/// configured with that table's attribute allowlists, plus any table-specific
/// named queries. The trait has separate associated types for create
/// requests, update requests, and responses.
///
/// `update` and `delete` return the affected-row count rather than assuming
/// the row still exists; a concurrent delete between a caller's existence
/// check and the write shows up as a zero count.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: i64) -> Result<Option<Self::Response>>;

    /// List all entities
    async fn list(&mut self) -> Result<Vec<Self::Response>>;

    /// Update an entity by ID, returning the number of rows touched
    async fn update(&mut self, id: i64, request: &Self::UpdateRequest) -> Result<u64>;

    /// Delete an entity by ID, returning the number of rows removed
    async fn delete(&mut self, id: i64) -> Result<u64>;
}
