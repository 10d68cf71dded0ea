use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::{QuerySpec, ResultSet};
use crate::domain::semantic_key::KnownPerson;
use crate::domain::DomainError;

/// Snapshot of the store contents shown to the model as grounding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorePreview {
    pub columns: Vec<String>,
    pub total_rows: usize,
    pub sample_names: Vec<String>,
    pub example_rows: ResultSet,
}

impl StorePreview {
    pub fn to_prompt_text(&self) -> String {
        format!(
            "Columnas: {}\nTotal de registros: {}\nEjemplos de nombres: {}\nFilas de ejemplo:\n{}",
            self.columns.join(", "),
            self.total_rows,
            self.sample_names.join(", "),
            self.example_rows.to_prompt_text(self.example_rows.returned()),
        )
    }
}

/// Read access to the contact store
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContactStore: Send + Sync + Debug {
    /// Run a parameterized statement. A rejected statement is a
    /// `QueryExecution` error; lost connectivity is a `Store` error.
    async fn execute(&self, spec: &QuerySpec) -> Result<ResultSet, DomainError>;

    /// Column list, size and a few sample rows
    async fn preview(&self) -> Result<StorePreview, DomainError>;

    /// Every recorded person name, used for name resolution
    async fn known_people(&self) -> Result<Vec<KnownPerson>, DomainError>;
}
