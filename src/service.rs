//! The chat service: the crate's single entry point.
//!
//! Owns conversation bookkeeping (identity resolution, history append
//! and truncation, first-interaction greeting) and the never-raise
//! boundary: whatever fails inside, the caller gets a string back. A
//! degraded generic apology is the only failure a user ever sees.

use std::sync::Arc;

use tracing::{error, info};

use crate::agent::client::create_provider;
use crate::agent::executor::{ToolDispatcher, ToolExecutor};
use crate::agent::message::{ChatRequest, system_message};
use crate::agent::orchestrator::HybridOrchestrator;
use crate::agent::prompt::{OFF_MODE_SYSTEM_PROMPT, PromptSet};
use crate::agent::provider::LlmProvider;
use crate::agent::runner::ParallelAgentRunner;
use crate::agent::specialist::specialist_roster;
use crate::agent::synthesizer::MetaAgent;
use crate::cache::QueryCache;
use crate::config::AssistantConfig;
use crate::error::Error;
use crate::history::{ContextSnapshot, ConversationId, ConversationStore};
use crate::retrieval::embedding::OpenAiEmbedder;
use crate::retrieval::pipeline::RetrievalPipeline;
use crate::retrieval::store::{SqlOracle, VectorStore};
use crate::retrieval::structured::StructuredQueryService;

/// Generic apology returned when even the sequential fallback failed.
const APOLOGY_MESSAGE: &str =
    "Lo siento, tuve un problema procesando tu mensaje. Por favor, intenta de nuevo más tarde.";

/// Greeting prepended to the first off-mode reply of a conversation.
const FIRST_INTERACTION_GREETING: &str = "Hola 👋, soy tu asistente de viajes 🤖, me puedes \
     preguntar sobre viajes, destinos, alojamientos o experiencias.\n\n";

/// Whether the assistant runs with its knowledge-base tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    /// Full agent capabilities.
    #[default]
    On,
    /// Limited mode: plain completions, no tools.
    Off,
}

/// One chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// The user's message.
    pub query: String,
    /// Channel token from the chat surface.
    pub channel: Option<String>,
    /// Thread token from the chat surface.
    pub thread: Option<String>,
    /// Whether tools are available this turn.
    pub mode: ChatMode,
    /// Display name of the person asking.
    pub display_name: String,
    /// Whether the parallel path may be used.
    pub use_parallel: bool,
}

impl ChatTurn {
    /// A turn with default settings (on mode, parallel allowed).
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            channel: None,
            thread: None,
            mode: ChatMode::On,
            display_name: "Usuario".to_string(),
            use_parallel: true,
        }
    }
}

/// The assistant service.
pub struct ChatService {
    store: ConversationStore,
    orchestrator: HybridOrchestrator,
    provider: Arc<dyn LlmProvider>,
    config: AssistantConfig,
}

impl ChatService {
    /// Wires the full service over the given datastore oracles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedProvider`] for unknown provider names.
    pub fn new(
        config: AssistantConfig,
        vector_store: Arc<dyn VectorStore>,
        sql_oracle: Arc<dyn SqlOracle>,
    ) -> Result<Self, Error> {
        let provider = create_provider(&config)?;
        Ok(Self::with_provider(config, provider, vector_store, sql_oracle))
    }

    /// Wires the service over an explicit provider (tests, proxies).
    #[must_use]
    pub fn with_provider(
        config: AssistantConfig,
        provider: Arc<dyn LlmProvider>,
        vector_store: Arc<dyn VectorStore>,
        sql_oracle: Arc<dyn SqlOracle>,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());

        let embedder = Arc::new(OpenAiEmbedder::new(&config));
        let pipeline = Arc::new(RetrievalPipeline::new(
            Arc::clone(&provider),
            embedder,
            vector_store,
            config.clone(),
        ));
        let structured = Arc::new(StructuredQueryService::new(
            Arc::clone(&provider),
            sql_oracle,
            &config,
        ));

        let cache = config
            .enable_query_cache
            .then(|| Arc::new(QueryCache::new(config.query_cache_ttl)));

        let dispatcher: Arc<dyn ToolDispatcher> = Arc::new(ToolExecutor::new(
            pipeline,
            structured,
            cache.clone(),
        ));

        let runner = config.enable_parallel_agents.then(|| {
            ParallelAgentRunner::new(
                specialist_roster(&config, &prompts),
                MetaAgent::new(&config, &prompts),
                config.parallel_execution_timeout,
            )
        });

        let orchestrator = HybridOrchestrator::new(
            Arc::clone(&provider),
            dispatcher,
            &config,
            &prompts,
            runner,
            cache,
        );

        Self {
            store: ConversationStore::new(),
            orchestrator,
            provider,
            config,
        }
    }

    /// Processes one chat turn. Never raises past this boundary.
    pub async fn chat(&self, turn: ChatTurn) -> String {
        match self.try_chat(&turn).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "chat turn failed past all recovery paths");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    async fn try_chat(&self, turn: &ChatTurn) -> Result<String, Error> {
        let id = ConversationId::new(turn.channel.as_deref(), turn.thread.as_deref());
        info!(
            conversation = %id,
            user = %turn.display_name,
            mode = ?turn.mode,
            "processing message"
        );

        // Holding the per-conversation lock for the whole turn serializes
        // concurrent turns on the same identity.
        let (state, first_interaction) = self.store.get_or_create(&id).await;
        let mut state = state.lock().await;

        state.push_user(&turn.query);
        let snapshot = ContextSnapshot {
            display_name: turn.display_name.clone(),
            channel: turn.channel.clone(),
            thread: turn.thread.clone(),
            first_interaction,
            history: state.messages().to_vec(),
        };

        let mut answer = match turn.mode {
            ChatMode::On if turn.use_parallel => {
                self.orchestrator.process(&turn.query, &snapshot).await?
            }
            ChatMode::On => {
                self.orchestrator
                    .process_sequential(&turn.query, &snapshot)
                    .await?
            }
            ChatMode::Off => self.off_mode_reply(&snapshot).await?,
        };

        if turn.mode == ChatMode::Off && first_interaction {
            answer = format!("{FIRST_INTERACTION_GREETING}{answer}");
        }
        let answer = answer.trim().to_string();

        state.push_assistant(&answer);
        info!(conversation = %id, "generated response");
        Ok(answer)
    }

    /// Plain completion over the history, no tools.
    async fn off_mode_reply(&self, snapshot: &ContextSnapshot) -> Result<String, Error> {
        let mut messages = Vec::with_capacity(snapshot.history.len() + 1);
        messages.push(system_message(OFF_MODE_SYSTEM_PROMPT));
        messages.extend(snapshot.history.iter().cloned());

        let request = ChatRequest {
            model: self.config.main_agent_model.clone(),
            messages,
            temperature: Some(0.3),
            max_tokens: Some(self.config.agent_max_tokens),
            json_mode: false,
            tools: Vec::new(),
        };
        let response = self.provider.chat(&request).await?;
        Ok(response.content)
    }

    /// Number of live conversations (operator introspection).
    pub async fn conversation_count(&self) -> usize {
        self.store.len().await
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("provider", &self.provider.name())
            .field("parallel_enabled", &self.config.enable_parallel_agents)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatResponse, TokenUsage};
    use crate::retrieval::store::MemoryStore;
    use async_trait::async_trait;

    struct EmptyOracle;

    #[async_trait]
    impl SqlOracle for EmptyOracle {
        async fn execute(&self, _sql: &str) -> Result<Vec<serde_json::Value>, Error> {
            Ok(Vec::new())
        }
    }

    /// Provider that echoes how many messages it received.
    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, Error> {
            Ok(ChatResponse {
                content: format!("vi {} mensajes", request.messages.len()),
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    /// Provider that always fails.
    struct DownProvider;

    #[async_trait]
    impl LlmProvider for DownProvider {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, Error> {
            Err(Error::ApiRequest {
                message: "connection refused".to_string(),
                status: None,
            })
        }
    }

    fn service(provider: Arc<dyn LlmProvider>) -> ChatService {
        let config = AssistantConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        ChatService::with_provider(
            config,
            provider,
            Arc::new(MemoryStore::new()),
            Arc::new(EmptyOracle),
        )
    }

    #[tokio::test]
    async fn test_chat_returns_answer() {
        let service = service(Arc::new(EchoProvider));
        let answer = service
            .chat(ChatTurn::new("¿Qué hoteles hay en Tulum?"))
            .await;
        // system + user turn.
        assert_eq!(answer, "vi 2 mensajes");
        assert_eq!(service.conversation_count().await, 1);
    }

    #[tokio::test]
    async fn test_chat_never_raises() {
        let service = service(Arc::new(DownProvider));
        let answer = service.chat(ChatTurn::new("hoteles en Tulum")).await;
        assert_eq!(answer, APOLOGY_MESSAGE);
    }

    #[tokio::test]
    async fn test_off_mode_greets_once() {
        let service = service(Arc::new(EchoProvider));
        let mut turn = ChatTurn::new("hola");
        turn.mode = ChatMode::Off;
        turn.channel = Some("C1".to_string());
        turn.thread = Some("T1".to_string());

        let first = service.chat(turn.clone()).await;
        assert!(first.starts_with("Hola 👋"));

        let second = service.chat(turn).await;
        assert!(!second.starts_with("Hola 👋"));
    }

    #[tokio::test]
    async fn test_history_accumulates_per_identity() {
        let service = service(Arc::new(EchoProvider));
        let mut turn = ChatTurn::new("primera pregunta");
        turn.channel = Some("C1".to_string());
        turn.thread = Some("T1".to_string());
        // system + user
        assert_eq!(service.chat(turn.clone()).await, "vi 2 mensajes");

        turn.query = "segunda pregunta".to_string();
        // system + user + assistant + user
        assert_eq!(service.chat(turn.clone()).await, "vi 4 mensajes");

        // A different thread starts fresh.
        turn.thread = Some("T2".to_string());
        assert_eq!(service.chat(turn).await, "vi 2 mensajes");
        assert_eq!(service.conversation_count().await, 2);
    }

    #[tokio::test]
    async fn test_use_parallel_false_stays_sequential() {
        let service = service(Arc::new(EchoProvider));
        let mut turn = ChatTurn::new(
            "hotel, tours, transporte y precios en Cancún",
        );
        turn.use_parallel = false;
        let answer = service.chat(turn).await;
        // Sequential path, one completion over system + user.
        assert_eq!(answer, "vi 2 mensajes");
    }
}
