//! Hybrid orchestrator: single-agent vs. parallel-multi-agent dispatch.
//!
//! Decides per query whether to run the general-purpose agent
//! sequentially or fan out across domain specialists. The decision path
//! is: cheap keyword fast path → model-based analyzer → dispatch. Any
//! error anywhere in that path degrades to the sequential single-agent
//! run; this fallback is the dominant recovery policy of the whole core.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::agentic_loop::agentic_loop;
use super::analyzer::{Complexity, Decision, QueryAnalyzer};
use super::executor::ToolDispatcher;
use super::message::{ChatRequest, system_message, user_message};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::runner::ParallelAgentRunner;
use super::specialist::GeneralAgent;
use super::traits::Agent;
use crate::cache::QueryCache;
use crate::config::AssistantConfig;
use crate::domain::{detect_domains, should_use_parallel};
use crate::error::Error;
use crate::history::ContextSnapshot;

/// Orchestrates query processing across the sequential and parallel paths.
pub struct HybridOrchestrator {
    provider: Arc<dyn LlmProvider>,
    dispatcher: Arc<dyn ToolDispatcher>,
    general: GeneralAgent,
    analyzer: QueryAnalyzer,
    runner: Option<ParallelAgentRunner>,
    cache: Option<Arc<QueryCache>>,
    enable_parallel: bool,
    min_domains: usize,
    fallback_to_sequential: bool,
}

impl HybridOrchestrator {
    /// Creates the orchestrator.
    ///
    /// Passing `runner: None` disables the parallel path entirely; every
    /// query then runs through the general agent.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dispatcher: Arc<dyn ToolDispatcher>,
        config: &AssistantConfig,
        prompts: &PromptSet,
        runner: Option<ParallelAgentRunner>,
        cache: Option<Arc<QueryCache>>,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            general: GeneralAgent::new(config, prompts),
            analyzer: QueryAnalyzer::new(config, &prompts.analyzer),
            runner,
            cache,
            enable_parallel: config.enable_parallel_agents,
            min_domains: config.min_domains_for_parallel,
            fallback_to_sequential: config.fallback_to_sequential,
        }
    }

    /// Processes a query, choosing the execution path.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] only when processing failed and the sequential
    /// fallback is disabled or failed as well; the caller turns that
    /// into the user-facing apology.
    pub async fn process(&self, query: &str, snapshot: &ContextSnapshot) -> Result<String, Error> {
        match self.try_process(query, snapshot).await {
            Ok(answer) => Ok(answer),
            Err(e) if self.fallback_to_sequential => {
                error!(error = %e, "orchestration failed, falling back to sequential agent");
                self.run_sequential(query, snapshot).await
            }
            Err(e) => Err(e),
        }
    }

    /// Processes a query on the sequential path only, bypassing the
    /// analyzer and runner (the caller opted out of parallel execution).
    ///
    /// # Errors
    ///
    /// Returns [`Error`] when the general agent run fails.
    pub async fn process_sequential(
        &self,
        query: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<String, Error> {
        self.run_sequential(query, snapshot).await
    }

    async fn try_process(&self, query: &str, snapshot: &ContextSnapshot) -> Result<String, Error> {
        // Fast path: if the keyword gate alone rejects parallel
        // execution, the analyzer's reasoning call is pure latency.
        let detected = detect_domains(query);
        let decision = if should_use_parallel(self.enable_parallel, self.min_domains, &detected) {
            self.analyze_cached(query).await
        } else {
            Decision {
                should_parallelize: false,
                complexity: if detected.len() > 1 {
                    Complexity::Complex
                } else {
                    Complexity::Simple
                },
                domains: detected,
            }
        };
        info!(
            should_parallelize = decision.should_parallelize,
            domains = ?decision.domains,
            complexity = ?decision.complexity,
            "query analysis"
        );

        if decision.should_parallelize
            && let Some(runner) = &self.runner
        {
            info!(domains = ?decision.domains, "using parallel execution");
            return runner
                .run_parallel(&self.provider, &self.dispatcher, query)
                .await;
        }

        info!("using sequential execution");
        self.run_sequential(query, snapshot).await
    }

    /// Runs the model-based analyzer, memoized when the cache is on.
    async fn analyze_cached(&self, query: &str) -> Decision {
        let cache_key = format!("analysis:{query}");
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&cache_key).await
            && let Ok(decision) = serde_json::from_str::<Decision>(&hit)
        {
            debug!("analysis cache hit");
            return decision;
        }

        let decision = self.analyzer.analyze(&*self.provider, query).await;

        if let Some(cache) = &self.cache
            && let Ok(json) = serde_json::to_string(&decision)
        {
            cache.put(&cache_key, &json).await;
        }
        decision
    }

    /// Runs the general-purpose agent with the conversation history.
    async fn run_sequential(
        &self,
        query: &str,
        snapshot: &ContextSnapshot,
    ) -> Result<String, Error> {
        let mut messages = Vec::with_capacity(snapshot.history.len() + 2);
        messages.push(system_message(self.general.system_prompt()));
        messages.extend(snapshot.history.iter().cloned());
        // The service layer records the user turn before processing;
        // cover direct callers that pass a bare snapshot.
        if snapshot
            .history
            .last()
            .is_none_or(|m| m.content != query)
        {
            messages.push(user_message(query));
        }

        let mut request = ChatRequest {
            model: self.general.model().to_string(),
            messages,
            temperature: Some(self.general.temperature()),
            max_tokens: Some(self.general.max_tokens()),
            json_mode: false,
            tools: self.general.tools(),
        };

        let response = agentic_loop(
            &*self.provider,
            &mut request,
            &*self.dispatcher,
            self.general.max_tool_iterations(),
        )
        .await?;
        Ok(response.content)
    }
}

impl std::fmt::Debug for HybridOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridOrchestrator")
            .field("provider", &self.provider.name())
            .field("parallel_enabled", &self.enable_parallel)
            .field("min_domains", &self.min_domains)
            .field("has_runner", &self.runner.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatResponse, TokenUsage};
    use crate::agent::runner::ParallelAgentRunner;
    use crate::agent::specialist::specialist_roster;
    use crate::agent::synthesizer::MetaAgent;
    use crate::agent::tool::{ToolCall, ToolResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubDispatcher;

    #[async_trait]
    impl ToolDispatcher for StubDispatcher {
        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult {
                tool_call_id: call.id.clone(),
                content: "stub".to_string(),
                is_error: false,
            }
        }
    }

    fn text_response(content: &str) -> ChatResponse {
        ChatResponse {
            content: content.to_string(),
            usage: TokenUsage::default(),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Provider that answers by agent role and counts calls.
    struct RoleProvider {
        calls: AtomicUsize,
        meta_fails: bool,
    }

    impl RoleProvider {
        const fn new(meta_fails: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                meta_fails,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for RoleProvider {
        fn name(&self) -> &'static str {
            "role"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let system = request
                .messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            let user = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();

            if user.contains("<specialist_sections>") {
                if self.meta_fails {
                    return Err(Error::ApiRequest {
                        message: "meta down".to_string(),
                        status: Some(500),
                    });
                }
                return Ok(text_response("respuesta combinada"));
            }
            if system.contains("query routing expert") {
                return Ok(text_response(
                    r#"{"should_parallelize": true, "domains": ["experiences", "lodging", "transportation", "database"], "complexity": "complex"}"#,
                ));
            }
            if system.contains("specialist") {
                return Ok(text_response("resultado de especialista"));
            }
            Ok(text_response("respuesta secuencial"))
        }
    }

    fn config(min_domains: usize) -> AssistantConfig {
        AssistantConfig::builder()
            .api_key("test")
            .min_domains_for_parallel(min_domains)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn orchestrator(
        provider: Arc<dyn LlmProvider>,
        min_domains: usize,
        with_runner: bool,
    ) -> HybridOrchestrator {
        let config = config(min_domains);
        let prompts = PromptSet::defaults();
        let runner = with_runner.then(|| {
            ParallelAgentRunner::new(
                specialist_roster(&config, &prompts),
                MetaAgent::new(&config, &prompts),
                Duration::from_secs(5),
            )
        });
        HybridOrchestrator::new(
            provider,
            Arc::new(StubDispatcher),
            &config,
            &prompts,
            runner,
            None,
        )
    }

    const MULTI_DOMAIN: &str =
        "Quiero un hotel en Cancún, tours de snorkel, transporte desde el aeropuerto y precios";

    #[tokio::test]
    async fn test_fast_path_skips_analyzer() {
        let provider = Arc::new(RoleProvider::new(false));
        let orchestrator = orchestrator(provider.clone() as Arc<dyn LlmProvider>, 4, true);

        let answer = orchestrator
            .process("¿Qué hoteles hay en Playa del Carmen con piscina?", &ContextSnapshot::default())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(answer, "respuesta secuencial");
        // One chat call total: the general agent. The analyzer was never
        // consulted because the fast path rejected parallel execution.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parallel_dispatch() {
        let provider = Arc::new(RoleProvider::new(false));
        let orchestrator = orchestrator(provider.clone() as Arc<dyn LlmProvider>, 4, true);

        let answer = orchestrator
            .process(MULTI_DOMAIN, &ContextSnapshot::default())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(answer, "respuesta combinada");
        // Analyzer + 4 specialists + meta.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_no_runner_means_sequential() {
        let provider = Arc::new(RoleProvider::new(false));
        let orchestrator = orchestrator(provider.clone() as Arc<dyn LlmProvider>, 4, false);

        let answer = orchestrator
            .process(MULTI_DOMAIN, &ContextSnapshot::default())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, "respuesta secuencial");
    }

    #[tokio::test]
    async fn test_meta_failure_falls_back_to_sequential() {
        let provider = Arc::new(RoleProvider::new(true));
        let orchestrator = orchestrator(provider.clone() as Arc<dyn LlmProvider>, 4, true);

        let answer = orchestrator
            .process(MULTI_DOMAIN, &ContextSnapshot::default())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, "respuesta secuencial");
    }

    #[tokio::test]
    async fn test_master_switch_disables_parallel() {
        let provider = Arc::new(RoleProvider::new(false));
        let config = AssistantConfig::builder()
            .api_key("test")
            .enable_parallel_agents(false)
            .min_domains_for_parallel(1)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let prompts = PromptSet::defaults();
        let orchestrator = HybridOrchestrator::new(
            provider.clone() as Arc<dyn LlmProvider>,
            Arc::new(StubDispatcher),
            &config,
            &prompts,
            None,
            None,
        );

        let answer = orchestrator
            .process(MULTI_DOMAIN, &ContextSnapshot::default())
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, "respuesta secuencial");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_is_threaded_into_sequential_run() {
        /// Provider asserting the request carries prior history.
        struct HistoryProbe;

        #[async_trait]
        impl LlmProvider for HistoryProbe {
            fn name(&self) -> &'static str {
                "probe"
            }

            async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, Error> {
                let has_history = request
                    .messages
                    .iter()
                    .any(|m| m.content == "pregunta anterior");
                Ok(text_response(if has_history { "con historia" } else { "sin historia" }))
            }
        }

        let orchestrator = orchestrator(Arc::new(HistoryProbe), 4, false);
        let snapshot = ContextSnapshot {
            history: vec![
                crate::agent::message::user_message("pregunta anterior"),
                crate::agent::message::assistant_message("respuesta anterior"),
            ],
            ..ContextSnapshot::default()
        };
        let answer = orchestrator
            .process("¿y con alberca?", &snapshot)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer, "con historia");
    }
}
