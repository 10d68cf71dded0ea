//! Cache-fronted question answering
//!
//! Questions are normalized to a semantic key and looked up in the semantic
//! cache before the search pipeline is run. Only successful runs are stored.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{CacheStats, DomainError, SemanticCache, SemanticKey, SessionContext};
use crate::infrastructure::normalizer::Normalizer;
use crate::infrastructure::search::SearchPipeline;

const DEFAULT_WARM_CONCURRENCY: usize = 4;

/// Common questions used to pre-warm the cache
pub const WARM_UP_QUERIES: &[&str] = &[
    "¿Quién es Luis Pérez?",
    "¿Quién es José Ángel Alvarado?",
    "¿Quién es Carmen Celina Ramirez?",
    "¿Quién es Guadalupe Alejandra Escobedo?",
    "¿Quién es Gabriela Jara Fuentes?",
    "¿Cuál es el teléfono de Luis Pérez?",
    "¿Cuál es el correo de José Ángel Alvarado?",
    "¿Dónde vive Carmen Celina Ramirez?",
    "¿Cuál es la función de Guadalupe Alejandra Escobedo?",
    "¿En qué zona trabaja Gabriela Jara Fuentes?",
    "Dame todas las personas de la zona 109",
    "¿Quiénes trabajan en la zona 110?",
    "Lista de personas en la zona 111",
    "¿Quiénes son docentes?",
    "Lista de directores",
    "Muestra todos los subdirectores",
    "¿Cuántos veladores hay?",
    "Personas casadas",
    "Docentes con licenciatura",
    "Personas que viven en Durango",
    "Maestros de la zona 109",
];

/// Answer to one question
#[derive(Debug, Clone, Serialize)]
pub struct AssistantAnswer {
    pub answer: String,
    /// Semantic key, absent when the question could not be normalized
    pub key: Option<SemanticKey>,
    pub cached: bool,
}

/// Outcome of a warm-up run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub warmed: usize,
    pub already_cached: usize,
    pub uncacheable: usize,
    pub failed: usize,
    /// Question and answer pairs, in completion order
    pub answers: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct AssistantService {
    normalizer: Normalizer,
    cache: Arc<dyn SemanticCache>,
    pipeline: SearchPipeline,
    cache_enabled: bool,
}

impl AssistantService {
    pub fn new(
        normalizer: Normalizer,
        cache: Arc<dyn SemanticCache>,
        pipeline: SearchPipeline,
    ) -> Self {
        Self {
            normalizer,
            cache,
            pipeline,
            cache_enabled: true,
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn cache(&self) -> &Arc<dyn SemanticCache> {
        &self.cache
    }

    /// Answer a question, reusing a cached answer for an equivalent question.
    ///
    /// A question that cannot be normalized runs the pipeline without touching
    /// the cache. Pipeline errors are returned as is and leave the cache
    /// unchanged.
    pub async fn answer(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<AssistantAnswer, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::validation("Query must not be empty"));
        }

        if !self.cache_enabled {
            let outcome = self.pipeline.run(query, context).await?;
            return Ok(AssistantAnswer {
                answer: outcome.answer,
                key: None,
                cached: false,
            });
        }

        let key = match self.normalizer.normalize(query, context).await {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Normalization failed, bypassing cache");
                let outcome = self.pipeline.run(query, context).await?;
                return Ok(AssistantAnswer {
                    answer: outcome.answer,
                    key: None,
                    cached: false,
                });
            }
        };

        if let Some(answer) = self.cache.get(&key) {
            info!(key = %key, "Cache hit");
            return Ok(AssistantAnswer {
                answer,
                key: Some(key),
                cached: true,
            });
        }

        debug!(key = %key, "Cache miss, running pipeline");
        let outcome = self.pipeline.run(query, context).await?;
        self.cache.put(key.clone(), outcome.answer.clone());

        Ok(AssistantAnswer {
            answer: outcome.answer,
            key: Some(key),
            cached: false,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self, reset_stats: bool) {
        self.cache.clear();
        if reset_stats {
            self.cache.reset_stats();
        }
        info!(reset_stats, "Cache cleared");
    }

    /// Answer each question once so later askers hit the cache
    pub async fn warm<S: AsRef<str>>(&self, queries: &[S]) -> WarmReport {
        self.warm_with_concurrency(queries, DEFAULT_WARM_CONCURRENCY).await
    }

    pub async fn warm_with_concurrency<S: AsRef<str>>(
        &self,
        queries: &[S],
        concurrency: usize,
    ) -> WarmReport {
        if !self.cache_enabled {
            warn!("Cache disabled, nothing to warm");
            return WarmReport {
                uncacheable: queries.len(),
                ..WarmReport::default()
            };
        }

        let outcomes: Vec<(String, Result<AssistantAnswer, DomainError>)> = stream::iter(queries)
            .map(|query| async move {
                let query = query.as_ref();
                (query.to_string(), self.answer(query, None).await)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = WarmReport::default();
        for (query, outcome) in outcomes {
            let answer = match outcome {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(query = %query, error = %e, "Warm-up query failed");
                    report.failed += 1;
                    continue;
                }
            };

            if answer.cached {
                report.already_cached += 1;
            } else if answer.key.is_none() {
                report.uncacheable += 1;
            } else {
                report.warmed += 1;
            }
            report.answers.push((query, answer.answer));
        }

        info!(
            warmed = report.warmed,
            already_cached = report.already_cached,
            failed = report.failed,
            "Cache warm-up finished"
        );
        report
    }
}
