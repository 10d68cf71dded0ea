//! Semantic keys: the canonical identity of a question

mod attribute;
mod classification;
mod key;
mod lexicon;
mod text;

pub use attribute::{composite_attribute_id, Attribute};
pub use classification::{
    canonical_value_for_token, Classification, EntityMention, QueryClassifier,
};
pub use key::{QueryKind, SemanticKey};
pub use lexicon::{KnownPerson, NameLexicon};
pub use text::{fold, identifier, strip_diacritics, words, DIACRITIC_FOLDS};
