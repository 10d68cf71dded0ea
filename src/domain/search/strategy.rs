use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::semantic_key::{words, Attribute, QueryKind};
use crate::domain::DomainError;

/// How strictly a text value must match a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The whole value appears as a word-aligned phrase
    Exact,
    /// Every word of the value appears somewhere
    Partial,
    /// Any word of the value appears somewhere
    AnyToken,
}

impl MatchMode {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "partial" || v == "parcial" || v == "fuzzy" => Self::Partial,
            Some(v) if v == "any" || v == "any_token" => Self::AnyToken,
            _ => Self::Exact,
        }
    }
}

/// A person named in the question
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameReference {
    pub text: String,
    pub mode: MatchMode,
}

impl NameReference {
    pub fn new(text: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            text: text.into(),
            mode,
        }
    }
}

/// A predicate on one attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: Attribute,
    pub value: String,
    pub mode: MatchMode,
}

impl Filter {
    pub fn new(attribute: Attribute, value: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            attribute,
            value: value.into(),
            mode,
        }
    }
}

/// Structured intent of a question. Replaced wholesale on refinement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    pub kind: QueryKind,
    pub names: Vec<NameReference>,
    pub attributes: Vec<Attribute>,
    pub filters: Vec<Filter>,
    pub limit: Option<u32>,
}

impl Strategy {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            names: Vec::new(),
            attributes: Vec::new(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn with_name(mut self, text: impl Into<String>, mode: MatchMode) -> Self {
        self.names.push(NameReference::new(text, mode));
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        if !self.attributes.contains(&attribute) {
            self.attributes.push(attribute);
        }
        self
    }

    pub fn with_filter(mut self, attribute: Attribute, value: impl Into<String>, mode: MatchMode) -> Self {
        self.filters.push(Filter::new(attribute, value, mode));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a large result is expected rather than ambiguous.
    ///
    /// A row limit only truncates the result, so it does not count.
    pub fn is_disambiguated(&self) -> bool {
        self.kind != QueryKind::Person || !self.filters.is_empty()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.kind == QueryKind::Person && self.names.is_empty() && self.filters.is_empty() {
            return Err(DomainError::analysis(
                "A person query needs at least one name or filter",
            ));
        }

        let blank_name = self.names.iter().any(|n| words(&n.text).is_empty());
        let blank_filter = self.filters.iter().any(|f| words(&f.value).is_empty());
        if blank_name || blank_filter {
            return Err(DomainError::analysis("Strategy contains an empty value"));
        }

        Ok(())
    }

    /// Broader alternatives, most conservative first: exact names become
    /// partial, exact filters become partial, multi-word names match any
    /// word, and finally the last filter is dropped.
    pub fn relaxations(&self) -> Vec<Strategy> {
        let mut candidates = Vec::new();

        if self.names.iter().any(|n| n.mode == MatchMode::Exact) {
            let mut next = self.clone();
            for name in &mut next.names {
                if name.mode == MatchMode::Exact {
                    name.mode = MatchMode::Partial;
                }
            }
            candidates.push(next);
        }

        if self.filters.iter().any(|f| f.mode == MatchMode::Exact) {
            let mut next = self.clone();
            for filter in &mut next.filters {
                if filter.mode == MatchMode::Exact {
                    filter.mode = MatchMode::Partial;
                }
            }
            candidates.push(next);
        }

        if self
            .names
            .iter()
            .any(|n| n.mode != MatchMode::AnyToken && words(&n.text).len() > 1)
        {
            let mut next = self.clone();
            for name in &mut next.names {
                name.mode = MatchMode::AnyToken;
            }
            candidates.push(next);
        }

        let can_drop_filter =
            !self.filters.is_empty() && (self.filters.len() > 1 || !self.names.is_empty() || self.kind != QueryKind::Person);
        if can_drop_filter {
            let mut next = self.clone();
            next.filters.pop();
            candidates.push(next);
        }

        candidates
    }

    /// Parse the analyzer's JSON reply.
    ///
    /// Unknown attributes are ignored; an unknown kind or a reply that is not
    /// an object is an analysis error.
    pub fn from_payload(payload: &Value) -> Result<Self, DomainError> {
        let parsed: StrategyPayload = serde_json::from_value(payload.clone())
            .map_err(|e| DomainError::analysis(format!("Unexpected strategy shape: {}", e)))?;

        let kind = QueryKind::parse(&parsed.kind)
            .ok_or_else(|| DomainError::analysis(format!("Unknown query kind: {}", parsed.kind)))?;

        let mut strategy = Strategy::new(kind);

        for name in parsed.names {
            let (text, mode) = match name {
                NamePayload::Plain(text) => (text, MatchMode::Exact),
                NamePayload::Detailed { text, mode } => (text, MatchMode::parse(mode.as_deref())),
            };
            if !words(&text).is_empty() {
                strategy = strategy.with_name(text, mode);
            }
        }

        for mention in parsed.attributes {
            if let Some(attribute) = Attribute::from_mention(&mention) {
                strategy = strategy.with_attribute(attribute);
            }
        }

        for filter in parsed.filters {
            let value = match filter.value {
                Value::String(s) => s,
                Value::Null => continue,
                other => other.to_string(),
            };
            if let Some(attribute) = Attribute::from_mention(&filter.field) {
                if !words(&value).is_empty() {
                    strategy = strategy.with_filter(attribute, value, MatchMode::parse(filter.mode.as_deref()));
                }
            }
        }

        strategy.limit = parsed.limit.filter(|limit| *limit > 0);
        strategy.validate()?;
        Ok(strategy)
    }

    /// JSON form used when describing the strategy to the model
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "kind": self.kind.as_str(),
            "names": self.names.iter().map(|n| serde_json::json!({"text": n.text, "match": n.mode})).collect::<Vec<_>>(),
            "attributes": self.attributes.iter().map(Attribute::id).collect::<Vec<_>>(),
            "filters": self.filters.iter().map(|f| serde_json::json!({"field": f.attribute.id(), "value": f.value, "match": f.mode})).collect::<Vec<_>>(),
            "limit": self.limit,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StrategyPayload {
    kind: String,
    #[serde(default)]
    names: Vec<NamePayload>,
    #[serde(default)]
    attributes: Vec<String>,
    #[serde(default)]
    filters: Vec<FilterPayload>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamePayload {
    Plain(String),
    Detailed {
        text: String,
        #[serde(default, rename = "match")]
        mode: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct FilterPayload {
    field: String,
    value: Value,
    #[serde(default, rename = "match")]
    mode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload() {
        let payload = json!({
            "kind": "person",
            "names": [{"text": "Luis Pérez", "match": "exact"}],
            "attributes": ["teléfono", "desconocido"],
            "filters": [{"field": "zona", "value": 109}],
            "limit": null
        });

        let strategy = Strategy::from_payload(&payload).unwrap();
        assert_eq!(strategy.kind, QueryKind::Person);
        assert_eq!(strategy.names, vec![NameReference::new("Luis Pérez", MatchMode::Exact)]);
        assert_eq!(strategy.attributes, vec![Attribute::Phone]);
        assert_eq!(strategy.filters, vec![Filter::new(Attribute::Zone, "109", MatchMode::Exact)]);
        assert_eq!(strategy.limit, None);
    }

    #[test]
    fn test_from_payload_plain_names() {
        let payload = json!({"kind": "person", "names": ["Carmen Celina Ramírez"]});
        let strategy = Strategy::from_payload(&payload).unwrap();
        assert_eq!(strategy.names[0].text, "Carmen Celina Ramírez");
    }

    #[test]
    fn test_from_payload_rejects_bad_input() {
        assert!(matches!(
            Strategy::from_payload(&json!({"kind": "weather"})),
            Err(DomainError::Analysis { .. })
        ));
        assert!(matches!(
            Strategy::from_payload(&json!(["person"])),
            Err(DomainError::Analysis { .. })
        ));
        assert!(matches!(
            Strategy::from_payload(&json!({"kind": "person", "names": []})),
            Err(DomainError::Analysis { .. })
        ));
    }

    #[test]
    fn test_count_without_filters_is_valid() {
        let strategy = Strategy::from_payload(&json!({"kind": "count"})).unwrap();
        assert!(strategy.is_disambiguated());
    }

    #[test]
    fn test_relaxations_order() {
        let strategy = Strategy::new(QueryKind::Person)
            .with_name("Luis Pérez", MatchMode::Exact)
            .with_filter(Attribute::Zone, "109", MatchMode::Exact);

        let relaxed = strategy.relaxations();
        assert_eq!(relaxed.len(), 4);
        assert_eq!(relaxed[0].names[0].mode, MatchMode::Partial);
        assert_eq!(relaxed[1].filters[0].mode, MatchMode::Partial);
        assert_eq!(relaxed[2].names[0].mode, MatchMode::AnyToken);
        assert!(relaxed[3].filters.is_empty());
        assert!(relaxed.iter().all(|candidate| candidate != &strategy));
    }

    #[test]
    fn test_fully_relaxed_strategy_has_no_relaxations() {
        let strategy = Strategy::new(QueryKind::Person).with_name("Luis", MatchMode::AnyToken);
        assert!(strategy.relaxations().is_empty());
    }

    #[test]
    fn test_disambiguation() {
        let person = Strategy::new(QueryKind::Person).with_name("Luis", MatchMode::Exact);
        assert!(!person.is_disambiguated());
        assert!(!person.clone().with_limit(10).is_disambiguated());
        assert!(person.clone().with_filter(Attribute::Zone, "109", MatchMode::Exact).is_disambiguated());
        assert!(Strategy::new(QueryKind::Listing).is_disambiguated());
    }
}
