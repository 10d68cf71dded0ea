use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{
    Classification, DomainError, NameLexicon, QueryClassifier, SemanticKey, SessionContext,
};

const DEFAULT_MEMO_CAPACITY: u64 = 2048;

/// Memo key: the raw query plus the fingerprint of the context it was asked in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    query: String,
    context: String,
}

/// Turns free text plus conversation context into a [`SemanticKey`].
///
/// Classification goes through the primary classifier, with an optional
/// secondary one when the primary fails. Follow-up questions that name no
/// entity borrow the entities of the previous query.
#[derive(Debug)]
pub struct Normalizer {
    classifier: Arc<dyn QueryClassifier>,
    secondary: Option<Arc<dyn QueryClassifier>>,
    lexicon: Option<Arc<NameLexicon>>,
    memo: Cache<MemoKey, SemanticKey>,
}

impl Normalizer {
    pub fn new(classifier: Arc<dyn QueryClassifier>) -> Self {
        Self {
            classifier,
            secondary: None,
            lexicon: None,
            memo: Cache::builder().max_capacity(DEFAULT_MEMO_CAPACITY).build(),
        }
    }

    pub fn with_secondary(mut self, classifier: Arc<dyn QueryClassifier>) -> Self {
        self.secondary = Some(classifier);
        self
    }

    pub fn with_lexicon(mut self, lexicon: NameLexicon) -> Self {
        self.lexicon = (!lexicon.is_empty()).then(|| Arc::new(lexicon));
        self
    }

    pub fn with_memo_capacity(mut self, capacity: u64) -> Self {
        self.memo = Cache::builder().max_capacity(capacity).build();
        self
    }

    pub fn memo_size(&self) -> u64 {
        self.memo.entry_count()
    }

    pub async fn normalize(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<SemanticKey, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::normalization("Empty query"));
        }

        let memo_key = MemoKey {
            query: query.to_string(),
            context: context.map(SessionContext::fingerprint).unwrap_or_default(),
        };

        if let Some(key) = self.memo.get(&memo_key).await {
            debug!(key = %key, "Normalizer memo hit");
            return Ok(key);
        }

        let mut classification = self.classify(query, context).await?;

        if !classification.has_entities() {
            if let Some(context) = context.filter(|c| c.is_follow_up(query)) {
                classification = self.borrow_from_previous(classification, context).await;
            }
        }

        let key = classification.to_key(self.lexicon.as_deref())?;
        debug!(query = %query, key = %key, "Query normalized");

        self.memo.insert(memo_key, key.clone()).await;
        Ok(key)
    }

    async fn classify(
        &self,
        query: &str,
        context: Option<&SessionContext>,
    ) -> Result<Classification, DomainError> {
        match self.classifier.classify(query, context).await {
            Ok(classification) => Ok(classification),
            Err(e) => match &self.secondary {
                Some(secondary) => {
                    warn!(
                        classifier = self.classifier.name(),
                        error = %e,
                        "Classifier failed, using {}",
                        secondary.name()
                    );
                    secondary.classify(query, context).await
                }
                None => Err(e),
            },
        }
    }

    /// Fill in the entities of a follow-up from the previous query
    async fn borrow_from_previous(
        &self,
        current: Classification,
        context: &SessionContext,
    ) -> Classification {
        let Some(previous_query) = context.previous_query() else {
            return current;
        };

        match self.classify(previous_query, None).await {
            Ok(previous) if previous.has_entities() => {
                debug!(previous = %previous_query, "Resolved follow-up against previous query");
                let attributes = if current.attributes.is_empty() {
                    previous.attributes
                } else {
                    current.attributes
                };
                Classification {
                    kind: previous.kind,
                    entities: previous.entities,
                    attributes,
                }
            }
            _ => current,
        }
    }
}
