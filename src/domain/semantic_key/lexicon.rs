use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use super::text::words;

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// A person's name as recorded in the contact store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownPerson {
    pub given_names: String,
    pub paternal_surname: String,
    #[serde(default)]
    pub maternal_surname: String,
}

impl KnownPerson {
    pub fn new(
        given_names: impl Into<String>,
        paternal_surname: impl Into<String>,
        maternal_surname: impl Into<String>,
    ) -> Self {
        Self {
            given_names: given_names.into(),
            paternal_surname: paternal_surname.into(),
            maternal_surname: maternal_surname.into(),
        }
    }

    /// `given_names` + first paternal surname token, folded and joined by `_`
    pub fn canonical_id(&self) -> String {
        let mut parts = words(&self.given_names);
        parts.extend(words(&self.paternal_surname).into_iter().take(1));
        parts.join("_")
    }

    fn tokens(&self) -> Vec<String> {
        let mut tokens = words(&self.given_names);
        tokens.extend(words(&self.paternal_surname));
        tokens.extend(words(&self.maternal_surname));
        tokens
    }
}

/// Known names used to spell-correct and reorder person mentions
#[derive(Debug, Clone)]
pub struct NameLexicon {
    people: Vec<KnownPerson>,
    threshold: f64,
}

impl Default for NameLexicon {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NameLexicon {
    pub fn new(people: Vec<KnownPerson>) -> Self {
        Self {
            people,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// True when the folded token is close to any token of any known name
    pub fn knows_token(&self, token: &str) -> bool {
        self.people.iter().any(|person| {
            person
                .tokens()
                .iter()
                .any(|known| jaro_winkler(token, known) >= self.threshold)
        })
    }

    /// Best known person for the mention tokens.
    ///
    /// Every mention token must resemble some token of the candidate's name;
    /// among candidates the highest mean similarity wins, then the one with
    /// the fewest unmatched name tokens.
    pub fn resolve(&self, mention_tokens: &[String]) -> Option<&KnownPerson> {
        if mention_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize, &KnownPerson)> = None;

        for person in &self.people {
            let tokens = person.tokens();
            let mut total = 0.0;
            let mut matched_all = true;

            for mention in mention_tokens {
                let score = tokens
                    .iter()
                    .map(|known| jaro_winkler(mention, known))
                    .fold(0.0_f64, f64::max);

                if score < self.threshold {
                    matched_all = false;
                    break;
                }
                total += score;
            }

            if !matched_all {
                continue;
            }

            let mean = total / mention_tokens.len() as f64;
            let extra = tokens.len().saturating_sub(mention_tokens.len());

            let better = match best {
                None => true,
                Some((best_mean, best_extra, _)) => {
                    mean > best_mean + f64::EPSILON
                        || ((mean - best_mean).abs() <= f64::EPSILON && extra < best_extra)
                }
            };

            if better {
                best = Some((mean, extra, person));
            }
        }

        best.map(|(_, _, person)| person)
    }
}
