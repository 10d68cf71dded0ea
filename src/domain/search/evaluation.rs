use serde::{Deserialize, Serialize};

use super::Strategy;

/// Verdict on whether a result set answers the question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub satisfactory: bool,
    pub assessment: String,
    pub refinement: Option<Strategy>,
}

impl Evaluation {
    pub fn satisfactory(assessment: impl Into<String>) -> Self {
        Self {
            satisfactory: true,
            assessment: assessment.into(),
            refinement: None,
        }
    }

    pub fn unsatisfactory(assessment: impl Into<String>) -> Self {
        Self {
            satisfactory: false,
            assessment: assessment.into(),
            refinement: None,
        }
    }

    pub fn with_refinement(mut self, strategy: Strategy) -> Self {
        self.refinement = Some(strategy);
        self
    }
}
