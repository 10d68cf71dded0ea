use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::DomainError;

/// What shape of answer a question expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Facts about specific people
    Person,
    /// Everyone matching a set of filters
    Listing,
    /// How many people match a set of filters
    Count,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Listing => "listing",
            Self::Count => "count",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "person" | "persona" => Some(Self::Person),
            "listing" | "listado" | "list" => Some(Self::Listing),
            "count" | "conteo" => Some(Self::Count),
            _ => None,
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `kind:entity_id:attribute_id` identity of a question
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticKey(String);

impl SemanticKey {
    pub fn new(kind: QueryKind, entity_id: &str, attribute_id: &str) -> Self {
        Self(format!("{}:{}:{}", kind.as_str(), entity_id, attribute_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn part(&self, index: usize) -> &str {
        self.0.splitn(3, ':').nth(index).unwrap_or_default()
    }

    pub fn kind(&self) -> Option<QueryKind> {
        QueryKind::parse(self.part(0))
    }

    pub fn entity_id(&self) -> &str {
        self.part(1)
    }

    pub fn attribute_id(&self) -> &str {
        self.part(2)
    }
}

impl TryFrom<String> for SemanticKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = value.splitn(3, ':').collect();

        let well_formed = parts.len() == 3
            && QueryKind::parse(parts[0]).is_some()
            && parts[1..].iter().all(|part| !part.is_empty());

        if !well_formed {
            return Err(DomainError::validation(format!(
                "Malformed semantic key: {}",
                value
            )));
        }

        Ok(Self(value))
    }
}

impl From<SemanticKey> for String {
    fn from(key: SemanticKey) -> Self {
        key.0
    }
}

impl fmt::Display for SemanticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
