//! Query normalization into semantic keys

mod llm_classifier;
mod normalizer;
mod rule_classifier;

pub use llm_classifier::{LlmQueryClassifier, CLASSIFY_HEADER};
pub use normalizer::Normalizer;
pub use rule_classifier::RuleBasedClassifier;
