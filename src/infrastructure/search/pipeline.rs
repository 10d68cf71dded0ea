use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{AnswerResponder, ResultEvaluator, StrategyAnalyzer};
use crate::domain::{
    ContactStore, DomainError, Evaluation, QueryBuilder, QuerySpec, ResultSet, SessionContext,
    StorePreview, Strategy,
};
use crate::infrastructure::observability::{record_pipeline_run, PipelineRunMetricParams};

pub const DEFAULT_MAX_REFINEMENTS: u32 = 2;

/// Everything the pipeline produced for one question
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub answer: String,
    pub strategy: Strategy,
    pub query_spec: QuerySpec,
    pub result_set: ResultSet,
    pub evaluation: Evaluation,
    /// Number of execute/evaluate cycles
    pub attempts: u32,
    /// True when the loop stopped without a satisfactory result
    pub exhausted: bool,
}

/// Analyze, build, execute, evaluate and respond, refining the strategy a
/// bounded number of times.
///
/// At most `max_refinements + 1` cycles run. A statement the store rejects
/// counts as an empty result; lost connectivity aborts the run.
#[derive(Debug)]
pub struct SearchPipeline {
    analyzer: StrategyAnalyzer,
    builder: QueryBuilder,
    store: Arc<dyn ContactStore>,
    evaluator: ResultEvaluator,
    responder: AnswerResponder,
    max_refinements: u32,
    preview: OnceCell<Option<StorePreview>>,
}

impl SearchPipeline {
    pub fn new(
        analyzer: StrategyAnalyzer,
        builder: QueryBuilder,
        store: Arc<dyn ContactStore>,
        evaluator: ResultEvaluator,
        responder: AnswerResponder,
    ) -> Self {
        Self {
            analyzer,
            builder,
            store,
            evaluator,
            responder,
            max_refinements: DEFAULT_MAX_REFINEMENTS,
            preview: OnceCell::new(),
        }
    }

    pub fn with_max_refinements(mut self, max_refinements: u32) -> Self {
        self.max_refinements = max_refinements;
        self
    }

    pub fn max_refinements(&self) -> u32 {
        self.max_refinements
    }

    /// Store preview, fetched once. A failed fetch is retried next time.
    async fn preview(&self) -> Option<&StorePreview> {
        let cell = self
            .preview
            .get_or_try_init(|| async {
                match self.store.preview().await {
                    Ok(preview) => Ok(Some(preview)),
                    Err(e) => {
                        warn!(error = %e, "Store preview unavailable");
                        Err(e)
                    }
                }
            })
            .await;

        cell.ok().and_then(Option::as_ref)
    }

    pub async fn run(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<PipelineOutcome, DomainError> {
        let start = Instant::now();
        let result = self.run_inner(query, context).await;

        let (outcome, attempts) = match &result {
            Ok(outcome) if outcome.exhausted => ("exhausted", outcome.attempts),
            Ok(outcome) => ("responded", outcome.attempts),
            Err(_) => ("failed", 0),
        };
        record_pipeline_run(PipelineRunMetricParams {
            outcome,
            attempts,
            duration: start.elapsed(),
        });

        result
    }

    async fn run_inner(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<PipelineOutcome, DomainError> {
        let preview = self.preview().await;
        let mut strategy = self.analyzer.analyze(query, context, preview).await?;

        let mut tried: Vec<Strategy> = Vec::new();
        let mut failed_executions = 0u32;
        let mut last_execution_error = None;
        let mut attempts = 0u32;

        let (query_spec, result_set, evaluation) = loop {
            attempts += 1;
            let spec = self.builder.build(&strategy);
            tried.push(strategy.clone());

            let result = match self.store.execute(&spec).await {
                Ok(result) => result,
                Err(e @ DomainError::QueryExecution { .. }) => {
                    warn!(attempt = attempts, error = %e, "Statement rejected, treating as empty");
                    failed_executions += 1;
                    last_execution_error = Some(e);
                    ResultSet::empty()
                }
                Err(e) => return Err(e),
            };

            debug!(
                attempt = attempts,
                rows = result.returned(),
                total = result.row_count,
                "Statement executed"
            );

            let evaluation = self.evaluator.evaluate(query, &strategy, &result, &tried).await;

            if evaluation.satisfactory || attempts > self.max_refinements {
                break (spec, result, evaluation);
            }

            match evaluation.refinement.clone() {
                Some(next) if !tried.contains(&next) => {
                    info!(attempt = attempts, assessment = %evaluation.assessment, "Refining strategy");
                    strategy = next;
                }
                _ => break (spec, result, evaluation),
            }
        };

        if failed_executions == attempts {
            if let Some(e) = last_execution_error {
                return Err(e);
            }
        }

        let exhausted = !evaluation.satisfactory;
        let answer = self
            .responder
            .respond(query, context, &strategy, &result_set, &evaluation.assessment)
            .await?;

        Ok(PipelineOutcome {
            answer,
            strategy,
            query_spec,
            result_set,
            evaluation,
            attempts,
            exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Attribute, GenerationOptions, MatchMode, MockContactStore, QueryKind, ScriptedLlmGateway,
    };
    use crate::infrastructure::search::{ANALYZE_HEADER, EVALUATE_HEADER, RESPOND_HEADER};
    use crate::infrastructure::store::test_support::seeded_store;
    use serde_json::json;

    fn pipeline(gateway: Arc<ScriptedLlmGateway>, store: Arc<dyn ContactStore>) -> SearchPipeline {
        let options = GenerationOptions::default();
        SearchPipeline::new(
            StrategyAnalyzer::new(gateway.clone(), options),
            QueryBuilder::new("contacts").unwrap(),
            store,
            ResultEvaluator::new(gateway.clone(), options),
            AnswerResponder::new(gateway, options),
        )
    }

    fn empty_preview_store() -> MockContactStore {
        let mut store = MockContactStore::new();
        store
            .expect_preview()
            .returning(|| Ok(StorePreview::default()));
        store
    }

    #[tokio::test]
    async fn test_happy_path_single_cycle() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": ["Luis Pérez"], "attributes": ["phone"]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": true, "assessment": "ok"}"#)
                .on(RESPOND_HEADER, "El teléfono de Luis Pérez es 618-555-0101."),
        );
        let store: Arc<dyn ContactStore> = Arc::new(seeded_store().await);

        let outcome = pipeline(gateway.clone(), store)
            .run("¿Cuál es el teléfono de Luis Pérez?", None)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "El teléfono de Luis Pérez es 618-555-0101.");
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.exhausted);
        assert_eq!(outcome.result_set.row_count, 1);
        assert_eq!(gateway.call_count(), 3);
        assert!(gateway.prompts()[0].contains("Luis Pérez García"));
    }

    #[tokio::test]
    async fn test_refinement_relaxes_exact_match() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": ["Pérez Luis"], "attributes": ["phone"]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": true}"#)
                .on(RESPOND_HEADER, "618-555-0101"),
        );
        let store: Arc<dyn ContactStore> = Arc::new(seeded_store().await);

        let outcome = pipeline(gateway, store).run("teléfono de Pérez Luis", None).await.unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.strategy.names[0].mode, MatchMode::Partial);
        assert!(!outcome.exhausted);
    }

    #[tokio::test]
    async fn test_refinements_are_bounded() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": [{"text": "Zacarías Nadie", "match": "exact"}], "filters": [{"field": "zone", "value": "999"}]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": false, "assessment": "vacío"}"#)
                .on(RESPOND_HEADER, "No encontré a esa persona."),
        );

        let mut store = empty_preview_store();
        store.expect_execute().times(3).returning(|_| Ok(ResultSet::empty()));
        let store: Arc<dyn ContactStore> = Arc::new(store);

        let outcome = pipeline(gateway.clone(), store)
            .with_max_refinements(2)
            .run("¿Quién es Zacarías Nadie de la zona 999?", None)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert!(outcome.exhausted);
        assert!(outcome.result_set.is_empty());
        assert_eq!(outcome.answer, "No encontré a esa persona.");
        assert!(gateway.call_count() <= 4 * 3);
        assert_eq!(gateway.calls_matching(EVALUATE_HEADER), 3);
    }

    #[tokio::test]
    async fn test_stops_when_nothing_new_to_try() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": [{"text": "Nadie", "match": "any_token"}]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": false}"#)
                .on(RESPOND_HEADER, "Sin resultados."),
        );
        let mut store = empty_preview_store();
        store.expect_execute().times(1).returning(|_| Ok(ResultSet::empty()));

        let outcome = pipeline(gateway, Arc::new(store)).run("¿Nadie?", None).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.exhausted);
    }

    #[tokio::test]
    async fn test_rejected_statements_everywhere_surface_error() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": ["Luis Pérez"]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": false}"#)
                .on(RESPOND_HEADER, "nunca"),
        );
        let mut store = empty_preview_store();
        store
            .expect_execute()
            .returning(|_| Err(DomainError::query_execution("no such table: contacts")));

        let err = pipeline(gateway.clone(), Arc::new(store))
            .run("¿Quién es Luis Pérez?", None)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::QueryExecution { .. }));
        assert_eq!(gateway.calls_matching(RESPOND_HEADER), 0);
    }

    #[tokio::test]
    async fn test_one_rejected_statement_is_recovered() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": ["Luis Pérez"]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": true}"#)
                .on(RESPOND_HEADER, "Luis Pérez es docente."),
        );
        let mut store = empty_preview_store();
        let mut seq = mockall::Sequence::new();
        store
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DomainError::query_execution("database is locked")));
        store
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(ResultSet::new(
                    vec!["full_name".to_string(), "role".to_string()],
                    vec![vec![json!("Luis Pérez García"), json!("Docente")]],
                ))
            });

        let outcome = pipeline(gateway, Arc::new(store))
            .run("¿Quién es Luis Pérez?", None)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.answer, "Luis Pérez es docente.");
    }

    #[tokio::test]
    async fn test_store_error_is_fatal() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "person", "names": ["Luis Pérez"]}"#),
        );
        let mut store = empty_preview_store();
        store
            .expect_execute()
            .times(1)
            .returning(|_| Err(DomainError::store("connection lost")));

        let err = pipeline(gateway, Arc::new(store))
            .run("¿Quién es Luis Pérez?", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Store { .. }));
    }

    #[tokio::test]
    async fn test_analysis_error_propagates() {
        let gateway = Arc::new(ScriptedLlmGateway::new().on(ANALYZE_HEADER, "???"));
        let mut store = empty_preview_store();
        store.expect_execute().never();

        let err = pipeline(gateway, Arc::new(store))
            .run("asdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Analysis { .. }));
    }

    #[tokio::test]
    async fn test_listing_uses_filters() {
        let gateway = Arc::new(
            ScriptedLlmGateway::new()
                .on(ANALYZE_HEADER, r#"{"kind": "listing", "filters": [{"field": "zone", "value": "109"}]}"#)
                .on(EVALUATE_HEADER, r#"{"satisfactory": true}"#)
                .on(RESPOND_HEADER, "En la zona 109 están Luis Pérez y José Ángel Alvarado."),
        );
        let store: Arc<dyn ContactStore> = Arc::new(seeded_store().await);

        let outcome = pipeline(gateway, store)
            .run("Dame todas las personas de la zona 109", None)
            .await
            .unwrap();

        assert_eq!(outcome.strategy.kind, QueryKind::Listing);
        assert_eq!(outcome.strategy.filters[0].attribute, Attribute::Zone);
        assert_eq!(outcome.result_set.row_count, 2);
    }
}
