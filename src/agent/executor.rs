//! Tool executor that dispatches tool calls into the retrieval core.
//!
//! Maps tool names to direct Rust calls against the retrieval pipeline
//! and the structured-data service. The executor also owns the
//! user-facing phrasing of retrieval outcomes: nearby-alternative
//! prefixes for broadened matches, "found nothing" for empty terminal
//! sets, and "could not search" for embedding failures — the last two
//! must never be conflated.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::tool::{ToolCall, ToolResult};
use crate::cache::QueryCache;
use crate::domain::Domain;
use crate::error::Error;
use crate::retrieval::pipeline::RetrievalPipeline;
use crate::retrieval::structured::StructuredQueryService;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Dispatches tool calls to their implementations.
///
/// The agentic loop depends on this interface rather than the concrete
/// executor, so tests can script tool outcomes.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Executes one tool call, never failing the loop itself.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}

/// Executes tool calls by dispatching to the retrieval core.
pub struct ToolExecutor {
    pipeline: Arc<RetrievalPipeline>,
    structured: Arc<StructuredQueryService>,
    cache: Option<Arc<QueryCache>>,
}

#[derive(Deserialize)]
struct ExperiencesArgs {
    location_and_activity_preferences: String,
}

#[derive(Deserialize)]
struct LodgingArgs {
    location_and_preferences: String,
}

#[derive(Deserialize)]
struct TransportArgs {
    route_and_preferences: String,
}

#[derive(Deserialize)]
struct StructuredArgs {
    natural_language_query: String,
}

/// What the tool layer calls each domain's results in user-facing text.
const fn domain_noun(domain: Domain) -> &'static str {
    match domain {
        Domain::Experiences => "experiencias",
        Domain::Lodging => "alojamientos",
        Domain::Transportation => "transporte",
        Domain::Database => "resultados",
    }
}

impl ToolExecutor {
    /// Creates an executor over the pipeline and structured service.
    #[must_use]
    pub fn new(
        pipeline: Arc<RetrievalPipeline>,
        structured: Arc<StructuredQueryService>,
        cache: Option<Arc<QueryCache>>,
    ) -> Self {
        Self {
            pipeline,
            structured,
            cache,
        }
    }

    fn parse_args<'a, T: Deserialize<'a>>(name: &str, args: &'a str) -> Result<T, Error> {
        serde_json::from_str(args).map_err(|e| Error::ToolExecution {
            name: name.to_string(),
            message: format!("invalid arguments: {e}"),
        })
    }

    /// Runs a retrieval tool and phrases its outcome.
    async fn tool_retrieve(&self, domain: Domain, query: &str) -> Result<String, Error> {
        let cache_key = format!("{domain}:{query}");
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&cache_key).await
        {
            return Ok(hit);
        }

        let retrieval = self.pipeline.retrieve(query, domain).await?;
        let noun = domain_noun(domain);

        let phrased = if retrieval.records.is_empty() {
            format!("No encontré {noun} para esa búsqueda.")
        } else if retrieval.is_exact_location() {
            retrieval.formatted
        } else {
            format!(
                "No encontré {noun} en la ubicación exacta pero te dejo algunas \
                 opciones cercanas: {}",
                retrieval.formatted
            )
        };

        if let Some(cache) = &self.cache {
            cache.put(&cache_key, &phrased).await;
        }
        Ok(phrased)
    }

    /// Runs the structured-data tool.
    async fn tool_structured(&self, nl_query: &str) -> Result<String, Error> {
        let answer = self.structured.answer(nl_query).await?;
        Ok(answer.unwrap_or_else(|| {
            "No encontré resultados para esa consulta en la base de datos.".to_string()
        }))
    }

    /// Phrases an error for the reasoning layer.
    ///
    /// Embedding failures become "could not search right now" — the
    /// search did not happen, which is different from finding nothing.
    fn error_content(name: &str, error: &Error) -> String {
        match error {
            Error::Embedding { .. } => {
                "No pude buscar en la base de conocimiento en este momento. \
                 Informa al usuario que lo intente de nuevo más tarde."
                    .to_string()
            }
            other => format!("tool '{name}' failed: {other}"),
        }
    }
}

#[async_trait]
impl ToolDispatcher for ToolExecutor {
    async fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match call.name.as_str() {
            "get_experiences" => match Self::parse_args::<ExperiencesArgs>(&call.name, &call.arguments)
            {
                Ok(args) => {
                    self.tool_retrieve(Domain::Experiences, &args.location_and_activity_preferences)
                        .await
                }
                Err(e) => Err(e),
            },
            "get_lodging" => match Self::parse_args::<LodgingArgs>(&call.name, &call.arguments) {
                Ok(args) => {
                    self.tool_retrieve(Domain::Lodging, &args.location_and_preferences)
                        .await
                }
                Err(e) => Err(e),
            },
            "get_transportation" => {
                match Self::parse_args::<TransportArgs>(&call.name, &call.arguments) {
                    Ok(args) => {
                        self.tool_retrieve(Domain::Transportation, &args.route_and_preferences)
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
            "query_structured_data" => {
                match Self::parse_args::<StructuredArgs>(&call.name, &call.arguments) {
                    Ok(args) => self.tool_structured(&args.natural_language_query).await,
                    Err(e) => Err(e),
                }
            }
            other => Err(Error::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: Self::error_content(&call.name, &e),
                    is_error: true,
                }
            }
        }
    }
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::provider::LlmProvider;
    use crate::config::AssistantConfig;
    use crate::retrieval::embedding::Embedder;
    use crate::retrieval::store::{MemoryStore, SqlOracle, StoredRecord};
    use std::time::Duration;

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

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Error> {
            Err(Error::Embedding {
                message: "503".to_string(),
            })
        }
    }

    struct EmptyOracle;

    #[async_trait]
    impl SqlOracle for EmptyOracle {
        async fn execute(&self, _sql: &str) -> Result<Vec<serde_json::Value>, Error> {
            Ok(Vec::new())
        }
    }

    fn config() -> AssistantConfig {
        AssistantConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..3 {
            store.insert(
                Domain::Lodging,
                StoredRecord {
                    id: format!("l{i}"),
                    narrative: "hotel".to_string(),
                    city: "Mérida".to_string(),
                    destination_name: "Yucatan".to_string(),
                    price_range: None,
                    supplier_name: String::new(),
                    payload: serde_json::json!({}),
                    embedding: vec![1.0, 0.0],
                },
            );
        }
        store
    }

    fn executor_with(
        narrative_json: &str,
        embedder: Arc<dyn Embedder>,
        cache: Option<Arc<QueryCache>>,
    ) -> ToolExecutor {
        let provider: Arc<dyn LlmProvider> = Arc::new(FixedProvider {
            content: narrative_json.to_string(),
        });
        let pipeline = Arc::new(RetrievalPipeline::new(
            Arc::clone(&provider),
            embedder,
            Arc::new(seeded_store()),
            config(),
        ));
        let structured = Arc::new(StructuredQueryService::new(
            provider,
            Arc::new(EmptyOracle),
            &config(),
        ));
        ToolExecutor::new(pipeline, structured, cache)
    }

    fn lodging_call(query: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "get_lodging".to_string(),
            arguments: format!(r#"{{"location_and_preferences": "{query}"}}"#),
        }
    }

    #[tokio::test]
    async fn test_exact_match_returns_formatted_results() {
        let executor = executor_with(r#"{"State_Code": "YUC"}"#, Arc::new(FixedEmbedder), None);
        let result = executor.execute(&lodging_call("hoteles en Mérida")).await;
        assert!(!result.is_error);
        assert!(result.content.contains("START OF LODGING"));
        assert!(!result.content.contains("opciones cercanas"));
    }

    #[tokio::test]
    async fn test_broadened_match_gets_nearby_prefix() {
        // Region ROO requested but only Yucatan records exist: the chain
        // broadens and the phrasing must say so.
        let executor = executor_with(r#"{"State_Code": "ROO"}"#, Arc::new(FixedEmbedder), None);
        let result = executor.execute(&lodging_call("hoteles en Cancún")).await;
        assert!(!result.is_error);
        assert!(result.content.starts_with("No encontré alojamientos en la ubicación exacta"));
        assert!(result.content.contains("opciones cercanas"));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_could_not_search() {
        let executor = executor_with("{}", Arc::new(FailingEmbedder), None);
        let result = executor.execute(&lodging_call("hoteles")).await;
        assert!(result.is_error);
        assert!(result.content.contains("No pude buscar"));
        // Not phrased as an empty result set.
        assert!(!result.content.contains("No encontré"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let executor = executor_with("{}", Arc::new(FixedEmbedder), None);
        let call = ToolCall {
            id: "call_9".to_string(),
            name: "get_weather".to_string(),
            arguments: "{}".to_string(),
        };
        let result = executor.execute(&call).await;
        assert!(result.is_error);
        assert!(result.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let executor = executor_with("{}", Arc::new(FixedEmbedder), None);
        let call = ToolCall {
            id: "call_2".to_string(),
            name: "get_lodging".to_string(),
            arguments: "not json".to_string(),
        };
        let result = executor.execute(&call).await;
        assert!(result.is_error);
        assert!(result.content.contains("invalid arguments"));
    }

    #[tokio::test]
    async fn test_oversized_arguments_rejected() {
        let executor = executor_with("{}", Arc::new(FixedEmbedder), None);
        let call = ToolCall {
            id: "call_3".to_string(),
            name: "get_lodging".to_string(),
            arguments: "x".repeat(MAX_TOOL_ARGS_LEN + 1),
        };
        let result = executor.execute(&call).await;
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }

    #[tokio::test]
    async fn test_structured_empty_is_found_nothing() {
        let executor = executor_with("{}", Arc::new(FixedEmbedder), None);
        let call = ToolCall {
            id: "call_4".to_string(),
            name: "query_structured_data".to_string(),
            arguments: r#"{"natural_language_query": "disponibilidad en julio"}"#.to_string(),
        };
        let result = executor.execute(&call).await;
        assert!(!result.is_error);
        assert!(result.content.contains("No encontré resultados"));
    }

    #[tokio::test]
    async fn test_cache_memoizes_retrieval() {
        let cache = Arc::new(QueryCache::new(Duration::from_secs(60)));
        let executor = executor_with(
            r#"{"State_Code": "YUC"}"#,
            Arc::new(FixedEmbedder),
            Some(Arc::clone(&cache)),
        );
        let first = executor.execute(&lodging_call("hoteles en Mérida")).await;
        assert!(!first.is_error);
        assert_eq!(cache.len().await, 1);

        let second = executor.execute(&lodging_call("hoteles en Mérida")).await;
        assert_eq!(first.content, second.content);
    }
}
