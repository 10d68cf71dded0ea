use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::semantic_key::{canonical_value_for_token, words};
use crate::domain::{
    Attribute, Classification, DomainError, EntityMention, QueryClassifier, QueryKind,
    SessionContext,
};

static ZONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:zona|zone|sector)\s+(?:numero\s+|no\s+)?(\d+)\b").expect("valid zone regex")
});

static LIVES_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:viven?|radican?|lives?)\s+en\s+(.+)$").expect("valid address regex"));

const COUNT_MARKERS: &[&str] = &["cuantos", "cuantas", "numero de", "cantidad de", "total de", "how many"];

const LISTING_MARKERS: &[&str] = &[
    "todos", "todas", "lista", "listado", "listar", "quienes", "muestra", "muestrame",
    "personas", "list", "all",
];

/// Folded words that never belong to a person's name
const STOPWORDS: &[&str] = &[
    "a", "al", "ademas", "all", "busca", "buscar", "cantidad", "como", "con", "conocer",
    "cual", "cuales", "cuantas", "cuantos", "da", "dame", "de", "del", "dicha", "dicho",
    "dime", "donde", "el", "ella", "ellas", "ellos", "en", "encuentra", "es", "esa", "ese",
    "esta", "estan", "este", "favor", "gente", "give", "hay", "hola", "how", "is", "la",
    "las", "le", "les", "lista", "listado", "listar", "lo", "los", "many", "me", "mi",
    "misma", "mismo", "muestra", "muestrame", "o", "of", "para", "persona", "personas",
    "por", "que", "quien", "quienes", "quiero", "saber", "se", "show", "sin", "sobre", "son",
    "su", "sus", "tambien", "the", "tiene", "tienen", "todas", "todo", "todos", "total",
    "trabaja", "trabajan", "u", "un", "una", "unas", "unos", "what", "who", "y",
];

/// Keyword classifier that needs no model call.
///
/// Person names are whatever is left once stopwords, attribute synonyms,
/// known group values and numbers are removed.
#[derive(Debug, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, query: &str) -> Classification {
        let tokens = words(query);
        let folded = tokens.join(" ");
        let padded = format!(" {} ", folded);
        let contains = |phrase: &str| padded.contains(&format!(" {} ", phrase));

        let is_count = COUNT_MARKERS.iter().any(|marker| contains(marker));
        let mut groups: Vec<EntityMention> = Vec::new();
        let mut consumed: Vec<String> = Vec::new();

        for capture in ZONE_RE.captures_iter(&folded) {
            groups.push(EntityMention::group(Attribute::Zone, &capture[1]));
            consumed.push(capture[1].to_string());
        }

        if let Some(capture) = LIVES_IN_RE.captures(&folded) {
            let place: Vec<String> = words(&capture[1])
                .into_iter()
                .filter(|token| !STOPWORDS.contains(&token.as_str()))
                .collect();
            if !place.is_empty() {
                groups.push(EntityMention::group(Attribute::Address, place.join(" ")));
                consumed.extend(place);
            }
        }

        for token in &tokens {
            if let Some((attribute, canonical)) = canonical_value_for_token(token) {
                groups.push(EntityMention::group(attribute, canonical));
                consumed.push(token.clone());
            }
        }

        let name_tokens: Vec<&String> = tokens
            .iter()
            .filter(|token| !STOPWORDS.contains(&token.as_str()))
            .filter(|token| !Attribute::is_synonym_token(token))
            .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
            .filter(|token| !consumed.contains(token))
            .collect();

        // "numero de" in a count question is not a phone request
        let attribute_text = if is_count {
            padded.replace(" numero de ", " ")
        } else {
            folded.clone()
        };
        let group_attributes: Vec<Attribute> = groups
            .iter()
            .filter_map(|group| match group {
                EntityMention::Group { attribute, .. } => Some(*attribute),
                EntityMention::Person { .. } => None,
            })
            .collect();
        let attributes: Vec<Attribute> = Attribute::detect_all(&attribute_text)
            .into_iter()
            .filter(|attribute| !group_attributes.contains(attribute))
            .collect();

        let kind = if is_count {
            QueryKind::Count
        } else if !name_tokens.is_empty() {
            QueryKind::Person
        } else if !groups.is_empty() || LISTING_MARKERS.iter().any(|marker| contains(marker)) {
            QueryKind::Listing
        } else {
            QueryKind::Person
        };

        let mut classification = Classification::new(kind);

        if kind == QueryKind::Person {
            if !name_tokens.is_empty() {
                let text = name_tokens
                    .iter()
                    .map(|token| token.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                classification = classification.with_entity(EntityMention::person(text));
            }
        } else {
            for group in groups {
                classification = classification.with_entity(group);
            }
        }

        for attribute in attributes {
            classification = classification.with_attribute(attribute.id());
        }

        classification
    }
}

#[async_trait]
impl QueryClassifier for RuleBasedClassifier {
    async fn classify(
        &self,
        query: &str,
        _context: Option<&SessionContext>,
    ) -> Result<Classification, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::normalization("Empty query"));
        }

        Ok(self.classify_text(query))
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(query: &str) -> String {
        RuleBasedClassifier::new()
            .classify_text(query)
            .to_key(None)
            .map(|key| key.as_str().to_string())
            .unwrap_or_else(|e| format!("error: {e}"))
    }

    #[test]
    fn test_person_questions() {
        assert_eq!(key("¿Quién es Luis Pérez?"), "person:luis_perez:identity");
        assert_eq!(key("¿Cuál es el teléfono de Luis Pérez?"), "person:luis_perez:phone");
        assert_eq!(key("dame el celular de luis perez"), "person:luis_perez:phone");
        assert_eq!(key("Pérez Luis teléfono"), "person:perez_luis:phone");
        assert_eq!(
            key("¿En qué zona trabaja Gabriela Jara Fuentes?"),
            "person:gabriela_jara_fuentes:zone"
        );
        assert_eq!(
            key("¿Dónde vive Carmen Celina Ramirez?"),
            "person:carmen_celina_ramirez:address"
        );
    }

    #[test]
    fn test_listing_questions() {
        assert_eq!(
            key("Dame todas las personas de la zona 109"),
            "listing:zone_109:identity"
        );
        assert_eq!(key("¿Quiénes trabajan en la zona 110?"), "listing:zone_110:identity");
        assert_eq!(key("Lista de personas en la zona 111"), "listing:zone_111:identity");
        assert_eq!(key("¿Quiénes son docentes?"), "listing:role_docente:identity");
        assert_eq!(key("Lista de directores"), "listing:role_director:identity");
        assert_eq!(key("Muestra todos los subdirectores"), "listing:role_subdirector:identity");
        assert_eq!(key("Personas casadas"), "listing:marital_status_casado:identity");
        assert_eq!(
            key("Docentes con licenciatura"),
            "listing:education_licenciatura+role_docente:identity"
        );
        assert_eq!(
            key("Personas que viven en Durango"),
            "listing:address_durango:identity"
        );
        assert_eq!(
            key("Maestros de la zona 109"),
            "listing:role_docente+zone_109:identity"
        );
    }

    #[test]
    fn test_count_questions() {
        assert_eq!(key("¿Cuántos veladores hay?"), "count:role_velador:identity");
        assert_eq!(
            key("número de docentes en la zona 110"),
            "count:role_docente+zone_110:identity"
        );
    }

    #[test]
    fn test_word_order_and_accents_do_not_matter() {
        assert_eq!(
            key("teléfono de LUIS PÉREZ"),
            key("¿cual es el telefono de luis perez?")
        );
        assert_eq!(key("¿Y su correo?"), "error: Normalization error: No entity could be identified in the query");
    }

    #[tokio::test]
    async fn test_empty_query_is_normalization_error() {
        let err = RuleBasedClassifier::new().classify("  ", None).await.unwrap_err();
        assert!(matches!(err, DomainError::Normalization { .. }));
    }
}
