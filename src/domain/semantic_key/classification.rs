use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use super::attribute::{composite_attribute_id, Attribute};
use super::key::{QueryKind, SemanticKey};
use super::lexicon::NameLexicon;
use super::text::words;
use crate::domain::session::SessionContext;
use crate::domain::DomainError;

/// Canonical spellings for filter values, keyed by the attribute they filter on
const VALUE_SYNONYMS: &[(Attribute, &str, &[&str])] = &[
    (
        Attribute::Role,
        "docente",
        &[
            "docente", "docentes", "maestro", "maestros", "maestra", "maestras", "profesor",
            "profesores", "profesora", "profesoras", "teacher", "teachers",
        ],
    ),
    (
        Attribute::Role,
        "subdirector",
        &["subdirector", "subdirectores", "subdirectora", "subdirectoras"],
    ),
    (
        Attribute::Role,
        "director",
        &["director", "directores", "directora", "directoras", "principal"],
    ),
    (
        Attribute::Role,
        "supervisor",
        &["supervisor", "supervisores", "supervisora", "supervisoras"],
    ),
    (Attribute::Role, "velador", &["velador", "veladores", "veladora"]),
    (
        Attribute::Role,
        "intendente",
        &["intendente", "intendentes", "conserje", "conserjes"],
    ),
    (
        Attribute::Role,
        "secretaria",
        &["secretaria", "secretarias", "secretario", "secretarios"],
    ),
    (
        Attribute::MaritalStatus,
        "casado",
        &["casado", "casada", "casados", "casadas", "married"],
    ),
    (
        Attribute::MaritalStatus,
        "soltero",
        &["soltero", "soltera", "solteros", "solteras", "single"],
    ),
    (
        Attribute::MaritalStatus,
        "divorciado",
        &["divorciado", "divorciada", "divorciados", "divorciadas"],
    ),
    (
        Attribute::MaritalStatus,
        "viudo",
        &["viudo", "viuda", "viudos", "viudas"],
    ),
    (
        Attribute::Education,
        "licenciatura",
        &["licenciatura", "licenciado", "licenciada", "licenciados", "licenciadas"],
    ),
    (
        Attribute::Education,
        "maestria",
        &["maestria", "maestrias", "master"],
    ),
    (
        Attribute::Education,
        "doctorado",
        &["doctorado", "doctorados", "phd"],
    ),
];

/// Given names plus both surnames, with room for a compound given name
const MAX_NAME_TOKENS: usize = 4;

/// Canonical filter value for a word, when the word is a known value
pub fn canonical_value_for_token(token: &str) -> Option<(Attribute, &'static str)> {
    VALUE_SYNONYMS
        .iter()
        .find(|(_, _, variants)| variants.contains(&token))
        .map(|(attribute, canonical, _)| (*attribute, *canonical))
}

fn canonical_value(attribute: Attribute, value: &str) -> String {
    let folded = words(value);
    if let [single] = folded.as_slice() {
        if let Some((known, canonical)) = canonical_value_for_token(single) {
            if known == attribute {
                return canonical.to_string();
            }
        }
    }
    folded.join("_")
}

/// Something a question refers to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityMention {
    /// A person, optionally already split into given and family names
    Person {
        text: String,
        #[serde(default)]
        given_names: Vec<String>,
        #[serde(default)]
        family_names: Vec<String>,
    },
    /// A group of people selected by an attribute value (`zone = 109`)
    Group { attribute: Attribute, value: String },
}

impl EntityMention {
    pub fn person(text: impl Into<String>) -> Self {
        Self::Person {
            text: text.into(),
            given_names: Vec::new(),
            family_names: Vec::new(),
        }
    }

    pub fn split_person(
        text: impl Into<String>,
        given_names: Vec<String>,
        family_names: Vec<String>,
    ) -> Self {
        Self::Person {
            text: text.into(),
            given_names,
            family_names,
        }
    }

    pub fn group(attribute: Attribute, value: impl Into<String>) -> Self {
        Self::Group {
            attribute,
            value: value.into(),
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, Self::Person { .. })
    }

    /// Identifier fragment for this mention inside a semantic key.
    ///
    /// Person names resolve through the lexicon first, which corrects spelling
    /// and order. Otherwise an explicit given/family split is used, or the
    /// folded words in the order they were written. `Ok(None)` means the
    /// mention is empty. An unresolved name carrying words no known contact
    /// has, or too many words to be a name, cannot be keyed.
    pub fn canonical_id(&self, lexicon: Option<&NameLexicon>) -> Result<Option<String>, DomainError> {
        match self {
            Self::Person {
                text,
                given_names,
                family_names,
            } => {
                let split = !(given_names.is_empty() && family_names.is_empty());
                let mentioned: Vec<String> = if split {
                    given_names
                        .iter()
                        .chain(family_names.iter())
                        .flat_map(|name| words(name))
                        .collect()
                } else {
                    words(text)
                };

                if mentioned.is_empty() {
                    return Ok(None);
                }

                if let Some(lexicon) = lexicon {
                    if let Some(known) = lexicon.resolve(&mentioned) {
                        return Ok(Some(known.canonical_id()));
                    }
                    if let Some(stray) = mentioned.iter().find(|token| !lexicon.knows_token(token)) {
                        return Err(DomainError::normalization(format!(
                            "'{}' in '{}' is not part of any known name",
                            stray, text
                        )));
                    }
                }

                if mentioned.len() > MAX_NAME_TOKENS {
                    return Err(DomainError::normalization(format!(
                        "'{}' is too long to be a person's name",
                        text
                    )));
                }

                let parts: Vec<String> = if split && !given_names.is_empty() {
                    let mut parts: Vec<String> =
                        given_names.iter().flat_map(|name| words(name)).collect();
                    parts.extend(family_names.iter().flat_map(|name| words(name)).take(1));
                    parts
                } else {
                    mentioned
                };

                Ok(Some(parts.join("_")))
            }
            Self::Group { attribute, value } => {
                let value = canonical_value(*attribute, value);
                Ok((!value.is_empty()).then(|| format!("{}_{}", attribute.id(), value)))
            }
        }
    }
}

/// Structured reading of a question, prior to canonicalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: QueryKind,
    #[serde(default)]
    pub entities: Vec<EntityMention>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl Classification {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: EntityMention) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn has_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// Attribute mentions mapped onto known attributes, sorted and deduplicated.
    ///
    /// An unknown mention fails: dropping it would give the question the key
    /// of a different one.
    pub fn canonical_attributes(&self) -> Result<Vec<Attribute>, DomainError> {
        let mut attributes = self
            .attributes
            .iter()
            .map(|mention| {
                Attribute::from_mention(mention).ok_or_else(|| {
                    DomainError::normalization(format!("Unknown attribute '{}'", mention))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        attributes.sort();
        attributes.dedup();
        Ok(attributes)
    }

    /// Build the semantic key.
    ///
    /// Person questions need at least one person; listings and counts use
    /// their group filters, or `all` when they only name attributes.
    pub fn to_key(&self, lexicon: Option<&NameLexicon>) -> Result<SemanticKey, DomainError> {
        let attributes = self.canonical_attributes()?;

        let wanted = |mention: &&EntityMention| match self.kind {
            QueryKind::Person => mention.is_person(),
            QueryKind::Listing | QueryKind::Count => !mention.is_person(),
        };

        let mut ids: Vec<String> = Vec::new();
        for mention in self.entities.iter().filter(wanted) {
            ids.extend(mention.canonical_id(lexicon)?);
        }
        ids.sort();
        ids.dedup();

        if ids.is_empty() {
            let has_specific_attribute = attributes.iter().any(|a| *a != Attribute::Identity);
            if self.kind == QueryKind::Person || !has_specific_attribute {
                return Err(DomainError::normalization(
                    "No entity could be identified in the query",
                ));
            }
            ids.push("all".to_string());
        }

        Ok(SemanticKey::new(
            self.kind,
            &ids.join("+"),
            &composite_attribute_id(&attributes),
        ))
    }
}

/// Reads a free-text question into a [`Classification`]
#[async_trait]
pub trait QueryClassifier: Send + Sync + Debug {
    async fn classify(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<Classification, DomainError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::semantic_key::KnownPerson;

    #[test]
    fn test_person_key_without_lexicon() {
        let classification = Classification::new(QueryKind::Person)
            .with_entity(EntityMention::person("Luis Pérez"))
            .with_attribute("teléfono");

        let key = classification.to_key(None).unwrap();
        assert_eq!(key.as_str(), "person:luis_perez:phone");
    }

    #[test]
    fn test_split_person_uses_given_family_order() {
        let mention = EntityMention::split_person(
            "Alvarado José Ángel",
            vec!["José Ángel".to_string()],
            vec!["Alvarado".to_string(), "Ruiz".to_string()],
        );
        assert_eq!(
            mention.canonical_id(None).unwrap().as_deref(),
            Some("jose_angel_alvarado")
        );
    }

    #[test]
    fn test_lexicon_corrects_spelling() {
        let lexicon = NameLexicon::new(vec![KnownPerson::new("Luis", "Pérez", "García")]);
        let classification = Classification::new(QueryKind::Person)
            .with_entity(EntityMention::person("luiz perez"))
            .with_attribute("celular");

        let key = classification.to_key(Some(&lexicon)).unwrap();
        assert_eq!(key.as_str(), "person:luis_perez:phone");
    }

    #[test]
    fn test_group_keys_are_sorted_and_canonical() {
        let classification = Classification::new(QueryKind::Listing)
            .with_entity(EntityMention::group(Attribute::Zone, "109"))
            .with_entity(EntityMention::group(Attribute::Role, "Maestros"));

        let key = classification.to_key(None).unwrap();
        assert_eq!(key.as_str(), "listing:role_docente+zone_109:identity");
    }

    #[test]
    fn test_count_without_groups_but_with_attribute() {
        let classification = Classification::new(QueryKind::Count).with_attribute("doble plaza");
        let key = classification.to_key(None).unwrap();
        assert_eq!(key.as_str(), "count:all:double_post");
    }

    #[test]
    fn test_missing_entity_is_normalization_error() {
        let classification = Classification::new(QueryKind::Person).with_attribute("teléfono");
        let err = classification.to_key(None).unwrap_err();
        assert!(matches!(err, DomainError::Normalization { .. }));

        let classification = Classification::new(QueryKind::Listing);
        assert!(classification.to_key(None).is_err());
    }

    #[test]
    fn test_composite_attributes() {
        let classification = Classification::new(QueryKind::Person)
            .with_entity(EntityMention::person("Carmen Ramírez"))
            .with_attribute("domicilio")
            .with_attribute("correo")
            .with_attribute("email");

        let key = classification.to_key(None).unwrap();
        assert_eq!(key.as_str(), "person:carmen_ramirez:address+email");
    }

    #[test]
    fn test_unknown_attribute_cannot_be_keyed() {
        let lexicon = NameLexicon::new(vec![KnownPerson::new("Luis", "Pérez", "García")]);
        let birthday = Classification::new(QueryKind::Person)
            .with_entity(EntityMention::person("Luis Pérez"))
            .with_attribute("birthday");

        let err = birthday.to_key(Some(&lexicon)).unwrap_err();
        assert!(matches!(err, DomainError::Normalization { .. }));

        let mixed = Classification::new(QueryKind::Person)
            .with_entity(EntityMention::person("Luis Pérez"))
            .with_attribute("phone")
            .with_attribute("color favorito");
        assert!(mixed.to_key(Some(&lexicon)).is_err());
    }

    #[test]
    fn test_unresolved_names_are_not_truncated() {
        let lexicon = NameLexicon::new(vec![
            KnownPerson::new("Luis", "Pérez", "García"),
            KnownPerson::new("Luis", "Martínez", "Soto"),
        ]);

        // A leftover non-name word must not merge two people under one key
        for text in ["cumpleaños Luis Pérez", "cumpleaños Luis Martínez"] {
            let classification =
                Classification::new(QueryKind::Person).with_entity(EntityMention::person(text));
            let err = classification.to_key(Some(&lexicon)).unwrap_err();
            assert!(matches!(err, DomainError::Normalization { .. }));
        }

        let perez = EntityMention::person("cumpleaños Luis Pérez").canonical_id(None).unwrap();
        let martinez = EntityMention::person("cumpleaños Luis Martínez").canonical_id(None).unwrap();
        assert_eq!(perez.as_deref(), Some("cumpleanos_luis_perez"));
        assert_ne!(perez, martinez);

        let rambling = EntityMention::person("signo zodiacal de Luis Pérez García");
        assert!(rambling.canonical_id(None).is_err());
    }

    #[test]
    fn test_classification_json_shape() {
        let json = r#"{
            "kind": "person",
            "entities": [{"type": "person", "text": "Luis Pérez", "given_names": ["Luis"], "family_names": ["Pérez"]}],
            "attributes": ["phone"]
        }"#;
        let classification: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(classification.kind, QueryKind::Person);
        assert_eq!(
            classification.to_key(None).unwrap().as_str(),
            "person:luis_perez:phone"
        );
    }
}
