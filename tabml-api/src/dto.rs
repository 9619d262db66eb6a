pub mod api;
pub mod model;
pub mod prediction;

pub use api::*;
pub use model::*;
pub use prediction::*;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: usize = 20;

// Pagination structures
#[derive(Debug, Deserialize, Validate)]
pub struct PaginationQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PaginationQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_PAGE_SIZE),
            offset: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, pagination: &PaginationQuery) -> Self {
        let limit = pagination.limit();
        Self {
            has_more: data.len() == limit,
            data,
            limit,
            offset: pagination.offset(),
        }
    }
}

// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
