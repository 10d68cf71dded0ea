use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{
    Classification, DomainError, GenerationOptions, LlmGateway, QueryClassifier, SessionContext,
};

pub const CLASSIFY_HEADER: &str = "Clasifica la consulta del usuario sobre la agenda de contactos.";

const CLASSIFY_INSTRUCTIONS: &str = r#"Responde solo con JSON con esta forma:
{"kind": "person" | "listing" | "count",
 "entities": [
   {"type": "person", "text": "<nombre tal como aparece>", "given_names": ["..."], "family_names": ["..."]}
   | {"type": "group", "attribute": "<atributo>", "value": "<valor>"}
 ],
 "attributes": ["<atributo>", ...]}

Atributos válidos: identity, phone, email, address, role, zone, workplace, education, marital_status, start_date, double_post.
- "person": la pregunta es sobre una o más personas concretas. Separa nombres de pila y apellidos; corrige faltas de ortografía evidentes.
- "listing": pide un listado de personas que cumplen filtros; cada filtro es una entidad "group".
- "count": pide cuántas personas cumplen los filtros.
- Si la consulta usa pronombres o se refiere a la conversación anterior, resuelve a quién se refiere usando el contexto.
- "attributes" lista lo que se pregunta, no los filtros. Si solo se pregunta quién es, usa ["identity"]."#;

/// Classifier backed by the language model
#[derive(Debug)]
pub struct LlmQueryClassifier {
    gateway: Arc<dyn LlmGateway>,
    options: GenerationOptions,
}

impl LlmQueryClassifier {
    pub fn new(gateway: Arc<dyn LlmGateway>, options: GenerationOptions) -> Self {
        Self { gateway, options }
    }

    fn build_prompt(query: &str, context: Option<&SessionContext>) -> String {
        let mut prompt = format!("{}\n\n{}\n\n", CLASSIFY_HEADER, CLASSIFY_INSTRUCTIONS);

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
}

#[async_trait]
impl QueryClassifier for LlmQueryClassifier {
    async fn classify(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<Classification, DomainError> {
        let prompt = Self::build_prompt(query, context);

        let payload = self
            .gateway
            .generate_structured(&prompt, &self.options)
            .await
            .map_err(|e| DomainError::normalization(format!("Classification failed: {}", e)))?;

        serde_json::from_value(payload)
            .map_err(|e| DomainError::normalization(format!("Unexpected classification: {}", e)))
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
