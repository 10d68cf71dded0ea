use serde::{Deserialize, Serialize};
use std::fmt;

use super::text::{fold, words};

/// Canonical attribute a question can ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Identity,
    Phone,
    Email,
    Address,
    Role,
    Zone,
    Workplace,
    Education,
    MaritalStatus,
    StartDate,
    DoublePost,
}

/// Folded synonyms per attribute. Multi-word entries match as phrases.
const SYNONYMS: &[(Attribute, &[&str])] = &[
    (
        Attribute::Identity,
        &[
            "identity", "informacion", "info", "datos", "quien", "quienes", "who",
            "details", "ficha",
        ],
    ),
    (
        Attribute::Phone,
        &[
            "phone", "telefono", "telefonos", "tel", "celular", "cel", "movil", "numero",
            "whatsapp", "cell", "mobile", "contacto telefonico",
        ],
    ),
    (
        Attribute::Email,
        &["email", "correo", "correo electronico", "mail", "e mail", "emails", "correos"],
    ),
    (
        Attribute::Address,
        &["address", "direccion", "domicilio", "vive", "viven", "casa", "ubicacion"],
    ),
    (
        Attribute::Role,
        &["role", "funcion", "puesto", "cargo", "rol", "position", "job", "ocupacion"],
    ),
    (
        Attribute::Zone,
        &["zone", "zona", "area", "sector", "region"],
    ),
    (
        Attribute::Workplace,
        &["workplace", "centro de trabajo", "centro trabajo", "escuela", "plantel", "school"],
    ),
    (
        Attribute::Education,
        &["education", "estudios", "formacion", "titulo", "escolaridad", "grado academico", "degree"],
    ),
    (
        Attribute::MaritalStatus,
        &["marital_status", "estado civil", "casado", "casada", "soltero", "soltera", "marital status"],
    ),
    (
        Attribute::StartDate,
        &[
            "start_date", "antiguedad", "fecha de ingreso", "fecha ingreso", "ingreso",
            "seniority", "start date",
        ],
    ),
    (
        Attribute::DoublePost,
        &["double_post", "doble plaza", "doble turno", "double post"],
    ),
];

impl Attribute {
    pub const ALL: [Attribute; 11] = [
        Attribute::Identity,
        Attribute::Phone,
        Attribute::Email,
        Attribute::Address,
        Attribute::Role,
        Attribute::Zone,
        Attribute::Workplace,
        Attribute::Education,
        Attribute::MaritalStatus,
        Attribute::StartDate,
        Attribute::DoublePost,
    ];

    /// Identifier used inside semantic keys
    pub fn id(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Address => "address",
            Self::Role => "role",
            Self::Zone => "zone",
            Self::Workplace => "workplace",
            Self::Education => "education",
            Self::MaritalStatus => "marital_status",
            Self::StartDate => "start_date",
            Self::DoublePost => "double_post",
        }
    }

    fn synonyms(&self) -> &'static [&'static str] {
        SYNONYMS
            .iter()
            .find(|(attribute, _)| attribute == self)
            .map_or(&[], |(_, synonyms)| *synonyms)
    }

    /// Resolve a single mention ("celular", "Correo electrónico", "phone")
    pub fn from_mention(mention: &str) -> Option<Self> {
        let folded = fold(&mention.replace('_', " "));
        if folded.is_empty() {
            return None;
        }

        Self::ALL.into_iter().find(|attribute| {
            attribute.id() == mention.trim()
                || attribute
                    .synonyms()
                    .iter()
                    .any(|synonym| fold(&synonym.replace('_', " ")) == folded)
        })
    }

    /// Every attribute whose synonyms occur in the text, sorted and deduplicated
    pub fn detect_all(text: &str) -> Vec<Self> {
        let tokens = words(text);
        let padded = format!(" {} ", tokens.join(" "));

        let mut found: Vec<Self> = Self::ALL
            .into_iter()
            .filter(|attribute| {
                attribute.synonyms().iter().any(|synonym| {
                    let needle = fold(&synonym.replace('_', " "));
                    padded.contains(&format!(" {} ", needle))
                })
            })
            .collect();

        found.sort();
        found.dedup();
        found
    }

    /// True when the folded token is one of this attribute's single-word synonyms
    pub fn is_synonym_token(token: &str) -> bool {
        SYNONYMS
            .iter()
            .flat_map(|(_, synonyms)| synonyms.iter())
            .any(|synonym| *synonym == token)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Composite attribute id: sorted, deduplicated ids joined by `+`.
/// An empty list means the question is about the entity itself, and
/// `identity` is dropped when anything more specific was asked.
pub fn composite_attribute_id(attributes: &[Attribute]) -> String {
    let mut ids: Vec<&str> = attributes
        .iter()
        .filter(|attribute| **attribute != Attribute::Identity || attributes.len() == 1)
        .map(Attribute::id)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        Attribute::Identity.id().to_string()
    } else {
        ids.join("+")
    }
}
