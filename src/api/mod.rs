//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! The surface follows RESTful conventions under `/api`:
//!
//! - **Authentication** (`/api/auth/*`): login and token check
//! - **Users** (`/api/users/*`): account management
//! - **Studies** (`/api/studies/*`): study CRUD
//! - **Simulation setup** (`/api/simulation-setup/*`): configuration writes
//! - **Simulation results** (`/api/simulation-results/*`): configuration and
//!   result reads, plus the external processor's result attachment
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! the document is served at `/docs`.

pub mod handlers;
pub mod models;
