//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with PostgreSQL.
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - per-table named queries)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ RecordStore │  (db::store - generic allowlisted CRUD)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: Generic record store with attribute allowlisting and
//!   parameterized query construction
//! - [`handlers`]: Repository implementations per table
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Connection lifecycle
//!
//! One connection per request: handlers acquire from the bounded pool at the
//! top of the handler and thread the connection through every repository
//! call. The pooled connection is released on drop, which covers every exit
//! path - success, validation failure, or error:
//!
//! ```ignore
//! let mut conn = state.db.acquire().await.map_err(DbError::from)?;
//! let mut repo = Users::new(&mut conn);
//! // ... operations; conn released when it falls out of scope ...
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;
