//! Contact store adapters

mod sqlite;

pub use sqlite::{ContactRecord, SqliteContactStore};

#[cfg(test)]
pub(crate) use sqlite::test_support;
