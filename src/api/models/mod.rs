//! API request/response models.

pub mod auth;
pub mod pagination;
pub mod simulations;
pub mod studies;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The `{data: ...}` envelope every non-error response uses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
