//! Request and response bodies of the query endpoints

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{CacheStats, SessionContext};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 1000, message = "query must be 1 to 1000 characters"))]
    pub query: String,
    #[validate(length(min = 1, max = 128))]
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub session_id: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearCacheParams {
    #[serde(default)]
    pub reset_stats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub cleared: bool,
    pub stats: CacheStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub session_id: String,
    pub context: SessionContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub reset: bool,
}
