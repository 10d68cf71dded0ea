use std::sync::Arc;

use crate::domain::{
    DomainError, GenerationOptions, LlmGateway, SessionContext, StorePreview, Strategy,
};

pub const ANALYZE_HEADER: &str = "Analiza la consulta del usuario y describe la búsqueda en la agenda.";

pub(crate) const STRATEGY_FORMAT: &str = r#"{"kind": "person" | "listing" | "count",
 "names": [{"text": "<nombre>", "match": "exact" | "partial" | "any_token"}],
 "attributes": ["<atributo>", ...],
 "filters": [{"field": "<atributo>", "value": "<valor>", "match": "exact" | "partial"}],
 "limit": <número o null>}"#;

const ANALYZE_INSTRUCTIONS: &str = "Atributos válidos: identity, phone, email, address, role, zone, \
workplace, education, marital_status, start_date, double_post.
- Usa \"names\" solo para personas concretas mencionadas en la consulta.
- Usa \"filters\" para condiciones como zona, función o estado civil.
- Empieza con coincidencia \"exact\"; solo usa \"partial\" si el nombre parece incompleto.
- Si la consulta se refiere a la conversación anterior, usa el contexto para resolver a quién se refiere.";

/// First pipeline stage: question to [`Strategy`]
#[derive(Debug)]
pub struct StrategyAnalyzer {
    gateway: Arc<dyn LlmGateway>,
    options: GenerationOptions,
}

impl StrategyAnalyzer {
    pub fn new(gateway: Arc<dyn LlmGateway>, options: GenerationOptions) -> Self {
        Self { gateway, options }
    }

    fn build_prompt(
        query: &str,
        context: Option<&SessionContext>,
        preview: Option<&StorePreview>,
    ) -> String {
        let mut prompt = format!(
            "{}\n\nResponde solo con JSON con esta forma:\n{}\n\n{}\n\n",
            ANALYZE_HEADER, STRATEGY_FORMAT, ANALYZE_INSTRUCTIONS
        );

        if let Some(preview) = preview {
            prompt.push_str(&format!("Datos disponibles:\n{}\n\n", preview.to_prompt_text()));
        }

        if let Some(context) = context {
            if let Some(previous) = context.previous_query() {
                prompt.push_str(&format!("Consulta anterior: {}\n", previous));
            }
            if let Some(answer) = context.previous_answer() {
                prompt.push_str(&format!("Respuesta anterior: {}\n", answer));
            }
        }

        prompt.push_str(&format!("Consulta: {}\n", query));
        prompt
    }

    /// Ask the model for a strategy. Output that still cannot be parsed after
    /// the fallback model is an [`DomainError::Analysis`] error.
    pub async fn analyze(
        &self,
        query: &str,
        context: Option<&SessionContext>,
        preview: Option<&StorePreview>,
    ) -> Result<Strategy, DomainError> {
        let prompt = Self::build_prompt(query, context, preview);

        let payload = self
            .gateway
            .generate_structured(&prompt, &self.options)
            .await
            .map_err(|e| match e {
                DomainError::Parse { message } => {
                    DomainError::analysis(format!("Unparsable strategy: {}", message))
                }
                other => other,
            })?;

        let strategy = Strategy::from_payload(&payload)?;
        tracing::debug!(strategy = %payload, "Strategy analyzed");
        Ok(strategy)
    }
}
