use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::analyzer::STRATEGY_FORMAT;
use crate::domain::{
    DomainError, Evaluation, GenerationOptions, LlmGateway, ResultSet, Strategy,
};

pub const EVALUATE_HEADER: &str = "Evalúa si los resultados responden la consulta del usuario.";

const DEFAULT_AMBIGUITY_THRESHOLD: usize = 5;
const DEFAULT_MAX_ROWS_IN_PROMPT: usize = 50;

/// Assessment given when the model verdict is missing
pub(crate) const JUDGE_UNAVAILABLE: &str = "No se pudo verificar el resultado";

#[derive(Debug, Deserialize)]
struct Verdict {
    satisfactory: bool,
    #[serde(default)]
    assessment: String,
    #[serde(default)]
    refinement: Option<Value>,
}

/// Judges a result set and proposes at most one untried alternative.
///
/// Empty and ambiguous results are unsatisfactory no matter what the model
/// says. When the model cannot be reached or answers nonsense the result is
/// unverified and counts as unsatisfactory, so a relaxation is still tried.
#[derive(Debug)]
pub struct ResultEvaluator {
    gateway: Arc<dyn LlmGateway>,
    options: GenerationOptions,
    ambiguity_threshold: usize,
    max_rows_in_prompt: usize,
}

impl ResultEvaluator {
    pub fn new(gateway: Arc<dyn LlmGateway>, options: GenerationOptions) -> Self {
        Self {
            gateway,
            options,
            ambiguity_threshold: DEFAULT_AMBIGUITY_THRESHOLD,
            max_rows_in_prompt: DEFAULT_MAX_ROWS_IN_PROMPT,
        }
    }

    pub fn with_ambiguity_threshold(mut self, threshold: usize) -> Self {
        self.ambiguity_threshold = threshold.max(1);
        self
    }

    pub fn with_max_rows_in_prompt(mut self, rows: usize) -> Self {
        self.max_rows_in_prompt = rows.max(1);
        self
    }

    /// Verdict from row counts alone
    fn rule_verdict(&self, strategy: &Strategy, result: &ResultSet) -> Option<String> {
        if result.is_empty() {
            return Some("No se encontraron resultados".to_string());
        }

        if !strategy.is_disambiguated() && result.row_count > self.ambiguity_threshold {
            return Some(format!(
                "La búsqueda es ambigua: {} coincidencias",
                result.row_count
            ));
        }

        None
    }

    fn build_prompt(
        &self,
        query: &str,
        strategy: &Strategy,
        result: &ResultSet,
        rule_finding: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "{}\n\nResponde solo con JSON: {{\"satisfactory\": true | false, \"assessment\": \"<explicación breve>\", \
             \"refinement\": <estrategia alternativa o null>}}\n\
             Si no es satisfactorio, propone una estrategia alternativa con esta forma:\n{}\n\
             Puedes relajar coincidencias exactas a parciales, corregir nombres mal escritos o quitar filtros redundantes.\n\n",
            EVALUATE_HEADER, STRATEGY_FORMAT
        );

        prompt.push_str(&format!("Consulta: {}\n", query));
        prompt.push_str(&format!("Estrategia usada: {}\n", strategy.to_payload()));
        if let Some(finding) = rule_finding {
            prompt.push_str(&format!("Observación: {}\n", finding));
        }
        prompt.push_str(&format!(
            "Resultados ({} en total):\n{}\n",
            result.row_count,
            result.to_prompt_text(self.max_rows_in_prompt)
        ));
        prompt
    }

    async fn ask_judge(&self, prompt: &str) -> Result<Verdict, DomainError> {
        let payload = self.gateway.generate_structured(prompt, &self.options).await?;
        serde_json::from_value(payload)
            .map_err(|e| DomainError::parse(format!("Unexpected verdict: {}", e)))
    }

    pub async fn evaluate(
        &self,
        query: &str,
        strategy: &Strategy,
        result: &ResultSet,
        tried: &[Strategy],
    ) -> Evaluation {
        let rule_finding = self.rule_verdict(strategy, result);
        let prompt = self.build_prompt(query, strategy, result, rule_finding.as_deref());

        let (judge_ok, assessment, proposal) = match self.ask_judge(&prompt).await {
            Ok(verdict) => {
                let proposal = verdict
                    .refinement
                    .filter(|value| !value.is_null())
                    .and_then(|value| match Strategy::from_payload(&value) {
                        Ok(strategy) => Some(strategy),
                        Err(e) => {
                            debug!(error = %e, "Ignoring unusable refinement");
                            None
                        }
                    });
                (verdict.satisfactory, verdict.assessment, proposal)
            }
            Err(e) => {
                warn!(error = %e, "Result judge unavailable, treating result as unverified");
                (false, JUDGE_UNAVAILABLE.to_string(), None)
            }
        };

        let satisfactory = rule_finding.is_none() && judge_ok;
        if satisfactory {
            let assessment = if assessment.is_empty() {
                format!("{} resultado(s) encontrados", result.row_count)
            } else {
                assessment
            };
            return Evaluation::satisfactory(assessment);
        }

        let assessment = match (rule_finding, assessment.is_empty()) {
            (Some(finding), true) => finding,
            (Some(finding), false) => format!("{}. {}", finding, assessment),
            (None, _) => assessment,
        };

        let refinement = proposal
            .filter(|candidate| !tried.contains(candidate))
            .or_else(|| {
                strategy
                    .relaxations()
                    .into_iter()
                    .find(|candidate| !tried.contains(candidate))
            });

        let evaluation = Evaluation::unsatisfactory(assessment);
        match refinement {
            Some(next) => evaluation.with_refinement(next),
            None => evaluation,
        }
    }
}
