//! Structured search over the contact store

mod column;
mod evaluation;
mod query_builder;
mod query_spec;
mod result_set;
mod store;
mod strategy;

pub use column::Column;
pub use evaluation::Evaluation;
pub use query_builder::QueryBuilder;
pub use query_spec::{QuerySpec, TOTAL_MATCHES_COLUMN};
pub use result_set::ResultSet;
pub use store::{ContactStore, StorePreview};
pub use strategy::{Filter, MatchMode, NameReference, Strategy};

#[cfg(test)]
pub use store::MockContactStore;
