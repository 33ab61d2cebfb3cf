//! The retrieval pipeline: narrative extraction → embedding → filtered
//! similarity search with progressive fallback → record formatting.
//!
//! The fallback chain is a strict linear state machine over
//! [`strategy_chain`]: states are the ordered filter strategies, the
//! unfiltered strategy is the unique terminal state, and transitions are
//! one-directional. A rejected stricter strategy is never retried.

use std::sync::Arc;

use tracing::{debug, info};

use super::embedding::Embedder;
use super::filters::{MatchKind, is_acceptable, relevance_threshold, strategy_chain};
use super::format::format_record;
use super::narrative::{NarrativeAgent, extract_narrative};
use super::store::{RetrievalRecord, VectorStore};
use crate::agent::provider::LlmProvider;
use crate::config::AssistantConfig;
use crate::domain::Domain;
use crate::error::Error;

/// Outcome of one retrieval call.
#[derive(Debug)]
pub struct Retrieval {
    /// Formatted record blocks, joined for the reasoning layer.
    pub formatted: String,
    /// The raw records backing the formatted text.
    pub records: Vec<RetrievalRecord>,
    /// Which fallback level produced the result set.
    pub match_kind: MatchKind,
    /// Whether the query named a region (so a non-regional match kind
    /// means the search was broadened past the requested area).
    pub regional_requested: bool,
}

impl Retrieval {
    /// Whether the results satisfy the query's regional constraint.
    ///
    /// True when no region was requested, or when the terminating
    /// strategy still carried the region predicate.
    #[must_use]
    pub const fn is_exact_location(&self) -> bool {
        !self.regional_requested || self.match_kind.is_regional()
    }
}

/// The per-domain retrieval pipeline.
pub struct RetrievalPipeline {
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: AssistantConfig,
}

impl RetrievalPipeline {
    /// Creates a pipeline over the given provider, embedder, and store.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            provider,
            embedder,
            store,
            config,
        }
    }

    /// Retrieves and formats records for a query in one domain.
    ///
    /// # Errors
    ///
    /// Propagates extraction, embedding, and search failures. An
    /// embedding failure is [`Error::Embedding`] and must stay
    /// distinguishable from an empty result set.
    pub async fn retrieve(&self, query: &str, domain: Domain) -> Result<Retrieval, Error> {
        // Step 1: structured narrative extraction.
        let agent = NarrativeAgent::new(domain, &self.config);
        let narrative = extract_narrative(&*self.provider, &agent, domain, query).await?;

        // Step 2: canonical text. A narrative with every field blank has
        // nothing to canonicalize; embed the raw query instead.
        let canonical = narrative.embedding_text();
        let embed_input = if canonical.is_empty() { query } else { &canonical };

        // Step 3: embed. Failures propagate.
        let embedding = self.embedder.embed(embed_input).await?;

        // Step 4: walk the fallback chain, most specific first.
        let chain = strategy_chain(&narrative.available_filters());
        let threshold = relevance_threshold(domain);
        let total = chain.len();

        for (index, strategy) in chain.iter().enumerate() {
            let records = self
                .store
                .search(domain, &embedding, &strategy.filters, self.config.search_limit)
                .await?;

            let last = index + 1 == total;
            let acceptable = is_acceptable(&records, threshold);
            debug!(
                domain = %domain,
                strategy = %strategy.kind,
                results = records.len(),
                acceptable,
                "evaluated filter strategy"
            );

            if !last && !acceptable {
                continue;
            }

            // Step 5: format the terminal result set.
            let formatted = records
                .iter()
                .map(|record| format_record(domain, record))
                .collect::<Vec<_>>()
                .join("\n\n");

            info!(
                domain = %domain,
                match_kind = %strategy.kind,
                results = records.len(),
                "retrieval complete"
            );

            return Ok(Retrieval {
                formatted,
                records,
                match_kind: strategy.kind,
                regional_requested: narrative.state_code().is_some(),
            });
        }

        // The chain always ends in a terminal strategy.
        Err(Error::orchestration("filter strategy chain was empty"))
    }
}

impl std::fmt::Debug for RetrievalPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("provider", &self.provider.name())
            .field("search_limit", &self.config.search_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::retrieval::filters::FilterSet;
    use crate::retrieval::store::{MemoryStore, StoredRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that always answers with a fixed narrative JSON.
    struct FixedProvider {
        content: String,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, Error> {
            Ok(ChatResponse {
                content: self.content.clone(),
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    /// Embedder that returns a fixed unit vector.
    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Embedder that always fails, for the propagation test.
    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Err(Error::Embedding {
                message: "service unavailable".to_string(),
            })
        }
    }

    /// Store wrapper recording the filter set of every search.
    struct RecordingStore {
        inner: MemoryStore,
        searches: Mutex<Vec<FilterSet>>,
    }

    #[async_trait]
    impl VectorStore for RecordingStore {
        async fn search(
            &self,
            domain: Domain,
            embedding: &[f32],
            filters: &FilterSet,
            limit: usize,
        ) -> Result<Vec<RetrievalRecord>, Error> {
            if let Ok(mut searches) = self.searches.lock() {
                searches.push(filters.clone());
            }
            self.inner.search(domain, embedding, filters, limit).await
        }
    }

    fn lodging_record(id: &str, destination: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            narrative: format!("narrative {id}"),
            city: destination.to_string(),
            destination_name: destination.to_string(),
            price_range: None,
            supplier_name: String::new(),
            payload: serde_json::json!({}),
            embedding,
        }
    }

    fn config() -> AssistantConfig {
        AssistantConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn pipeline_with(
        narrative_json: &str,
        store: Arc<dyn VectorStore>,
    ) -> RetrievalPipeline {
        RetrievalPipeline::new(
            Arc::new(FixedProvider {
                content: narrative_json.to_string(),
            }),
            Arc::new(FixedEmbedder),
            store,
            config(),
        )
    }

    #[tokio::test]
    async fn test_regional_underdelivery_falls_to_unfiltered() {
        // One regional record is not enough (needs 3); the chain must
        // fall through to the unfiltered terminal strategy.
        let mut inner = MemoryStore::new();
        inner.insert(Domain::Lodging, lodging_record("roo-1", "Quintana Roo", vec![1.0, 0.0]));
        inner.insert(Domain::Lodging, lodging_record("oax-1", "Oaxaca", vec![1.0, 0.0]));
        inner.insert(Domain::Lodging, lodging_record("oax-2", "Oaxaca", vec![1.0, 0.0]));
        let store = Arc::new(RecordingStore {
            inner,
            searches: Mutex::new(Vec::new()),
        });

        let pipeline = pipeline_with(r#"{"Location": "Cancún", "State_Code": "ROO"}"#, store.clone() as Arc<dyn VectorStore>);
        let retrieval = pipeline
            .retrieve("hoteles en Cancún", Domain::Lodging)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(retrieval.match_kind, MatchKind::NoFilters);
        assert!(retrieval.regional_requested);
        assert!(!retrieval.is_exact_location());
        assert_eq!(retrieval.records.len(), 3);

        // Strictly decreasing specificity, no revisits.
        let searches = store.searches.lock().unwrap_or_else(|e| e.into_inner());
        for pair in searches.windows(2) {
            assert!(pair[0].specificity() >= pair[1].specificity());
        }
    }

    #[tokio::test]
    async fn test_acceptable_strategy_short_circuits() {
        let mut inner = MemoryStore::new();
        for i in 0..3 {
            inner.insert(
                Domain::Lodging,
                lodging_record(&format!("roo-{i}"), "Quintana Roo", vec![1.0, 0.0]),
            );
        }
        let store = Arc::new(RecordingStore {
            inner,
            searches: Mutex::new(Vec::new()),
        });

        let pipeline = pipeline_with(r#"{"State_Code": "ROO"}"#, store.clone() as Arc<dyn VectorStore>);
        let retrieval = pipeline
            .retrieve("hoteles en la riviera", Domain::Lodging)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(retrieval.match_kind, MatchKind::StateOnly);
        assert!(retrieval.is_exact_location());

        // Exactly one search: the accepted strategy ended the chain.
        let searches = store.searches.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(searches.len(), 1);
    }

    #[tokio::test]
    async fn test_no_region_means_exact() {
        let mut inner = MemoryStore::new();
        inner.insert(Domain::Experiences, lodging_record("e1", "Oaxaca", vec![1.0, 0.0]));
        let pipeline = pipeline_with("{}", Arc::new(inner));

        let retrieval = pipeline
            .retrieve("algo que hacer", Domain::Experiences)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(retrieval.match_kind, MatchKind::NoFilters);
        assert!(!retrieval.regional_requested);
        assert!(retrieval.is_exact_location());
    }

    #[tokio::test]
    async fn test_empty_terminal_set_is_not_an_error() {
        let pipeline = pipeline_with("{}", Arc::new(MemoryStore::new()));
        let retrieval = pipeline
            .retrieve("hoteles en Marte", Domain::Lodging)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(retrieval.records.is_empty());
        assert!(retrieval.formatted.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let pipeline = RetrievalPipeline::new(
            Arc::new(FixedProvider {
                content: "{}".to_string(),
            }),
            Arc::new(FailingEmbedder),
            Arc::new(MemoryStore::new()),
            config(),
        );
        let result = pipeline.retrieve("hoteles", Domain::Lodging).await;
        assert!(matches!(result, Err(Error::Embedding { .. })));
    }

    #[tokio::test]
    async fn test_formatted_output_contains_records() {
        let mut inner = MemoryStore::new();
        for i in 0..3 {
            inner.insert(
                Domain::Lodging,
                StoredRecord {
                    payload: serde_json::json!({
                        "serviceDetails": {"supplierName": format!("Hotel {i}")}
                    }),
                    ..lodging_record(&format!("l{i}"), "Yucatan", vec![1.0, 0.0])
                },
            );
        }
        let pipeline = pipeline_with(r#"{"State_Code": "YUC"}"#, Arc::new(inner));
        let retrieval = pipeline
            .retrieve("hoteles en Mérida", Domain::Lodging)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(retrieval.formatted.contains("Hotel 0"));
        assert!(retrieval.formatted.contains("Hotel 2"));
        assert!(retrieval.formatted.contains("START OF LODGING"));
    }
}
