use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{
    DomainError, GenerationOptions, LlmGateway, QueryKind, ResultSet, SessionContext, Strategy,
};

pub const RESPOND_HEADER: &str = "Redacta la respuesta para el usuario usando solo los resultados dados.";

const RESPOND_INSTRUCTIONS: &str = "- Responde en español, de forma breve y directa.
- No inventes datos que no aparezcan en los resultados.
- Si no hay resultados, dilo con amabilidad y sugiere cómo reformular la consulta.
- Si se muestran menos resultados que el total, menciona el total.";

const DEFAULT_MAX_ROWS_IN_PROMPT: usize = 50;

/// Final stage: turns the last result set into prose
#[derive(Debug)]
pub struct AnswerResponder {
    gateway: Arc<dyn LlmGateway>,
    options: GenerationOptions,
    max_rows_in_prompt: usize,
}

impl AnswerResponder {
    pub fn new(gateway: Arc<dyn LlmGateway>, options: GenerationOptions) -> Self {
        Self {
            gateway,
            options,
            max_rows_in_prompt: DEFAULT_MAX_ROWS_IN_PROMPT,
        }
    }

    pub fn with_max_rows_in_prompt(mut self, rows: usize) -> Self {
        self.max_rows_in_prompt = rows.max(1);
        self
    }

    fn build_prompt(
        &self,
        query: &str,
        context: Option<&SessionContext>,
        strategy: &Strategy,
        result: &ResultSet,
        assessment: &str,
    ) -> String {
        let mut prompt = format!("{}\n\n{}\n\n", RESPOND_HEADER, RESPOND_INSTRUCTIONS);

        if let Some(previous) = context.and_then(SessionContext::previous_query) {
            prompt.push_str(&format!("Consulta anterior: {}\n", previous));
        }

        prompt.push_str(&format!("Consulta: {}\n", query));
        if strategy.kind == QueryKind::Count {
            prompt.push_str(&format!("Total de coincidencias: {}\n", result.row_count));
        }
        if !assessment.is_empty() {
            prompt.push_str(&format!("Evaluación: {}\n", assessment));
        }
        prompt.push_str(&format!(
            "Resultados:\n{}\n",
            result.to_prompt_text(self.max_rows_in_prompt)
        ));
        prompt
    }

    pub async fn respond(
        &self,
        query: &str,
        context: Option<&SessionContext>,
        strategy: &Strategy,
        result: &ResultSet,
        assessment: &str,
    ) -> Result<String, DomainError> {
        let prompt = self.build_prompt(query, context, strategy, result, assessment);
        let text = self.gateway.generate(&prompt, &self.options).await?;
        Ok(remove_duplicate_lines(&text))
    }
}

/// Drop repeated non-blank lines, keeping the first occurrence
pub fn remove_duplicate_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.trim()
        .lines()
        .filter(|line| {
            let key = line.trim();
            key.is_empty() || seen.insert(key.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
