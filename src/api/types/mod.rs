//! HTTP request, response and error types

pub mod error;
pub mod json;
pub mod query;

pub use error::{ApiError, ApiErrorType};
pub use json::{Json, ValidatedJson};
pub use query::{
    CacheStatsResponse, ClearCacheParams, ClearCacheResponse, ContextResponse, QueryRequest,
    QueryResponse, ResetResponse,
};
