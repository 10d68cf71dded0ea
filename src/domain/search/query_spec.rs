use serde::{Deserialize, Serialize};

/// Column carrying the full match count when a statement is limited
pub const TOTAL_MATCHES_COLUMN: &str = "total_matches";

/// Parameterized statement derived from a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub statement: String,
    pub params: Vec<String>,
    /// Result column holding the total number of matching rows, if any
    pub total_column: Option<String>,
}

impl QuerySpec {
    pub fn new(statement: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            statement: statement.into(),
            params,
            total_column: None,
        }
    }

    pub fn with_total_column(mut self, column: impl Into<String>) -> Self {
        self.total_column = Some(column.into());
        self
    }
}
