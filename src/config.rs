//! Assistant configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Default minimum detected domains before parallel execution is considered.
/// Set to 4+ to avoid parallelization overhead on queries that would not
/// benefit from it.
const DEFAULT_MIN_DOMAINS_FOR_PARALLEL: usize = 4;
/// Default deadline for a whole parallel specialist batch, in seconds.
const DEFAULT_PARALLEL_TIMEOUT_SECS: u64 = 60;
/// Default TTL for query cache entries, in seconds.
const DEFAULT_QUERY_CACHE_TTL_SECS: u64 = 3600;
/// Default model for every reasoning role.
const DEFAULT_MODEL: &str = "gpt-4.1-mini-2025-04-14";
/// Default embedding model (any OpenAI-compatible embeddings endpoint).
const DEFAULT_EMBEDDING_MODEL: &str = "jina-clip-v2";
/// Default embedding dimensionality.
const DEFAULT_EMBEDDING_DIMENSIONS: u32 = 1024;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Default maximum records requested from the similarity search.
const DEFAULT_SEARCH_LIMIT: usize = 10;
/// Default max tokens for the general and specialist agents.
const DEFAULT_AGENT_MAX_TOKENS: u32 = 2048;
/// Default max tokens for the meta-synthesizer.
const DEFAULT_META_MAX_TOKENS: u32 = 4096;
/// Default max tokens for the query analyzer and narrative extractor.
const DEFAULT_STRUCTURED_MAX_TOKENS: u32 = 600;

/// Configuration for the assistant core.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the general-purpose (sequential) agent.
    pub main_agent_model: String,
    /// Model for the domain specialist agents.
    pub specialist_model: String,
    /// Model for the meta-synthesizer.
    pub meta_agent_model: String,
    /// Model for the query analyzer.
    pub query_analyzer_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Embedding vector dimensionality.
    pub embedding_dimensions: u32,
    /// Master switch for parallel specialist execution.
    pub enable_parallel_agents: bool,
    /// Minimum detected domains before parallel execution is considered.
    pub min_domains_for_parallel: usize,
    /// Deadline for a whole parallel specialist batch.
    pub parallel_execution_timeout: Duration,
    /// Whether orchestration errors degrade to the sequential agent.
    pub fallback_to_sequential: bool,
    /// Whether query analysis / retrieval memoization is enabled.
    pub enable_query_cache: bool,
    /// TTL for query cache entries.
    pub query_cache_ttl: Duration,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Maximum records requested from each similarity search.
    pub search_limit: usize,
    /// Maximum tokens for general/specialist agent responses.
    pub agent_max_tokens: u32,
    /// Maximum tokens for meta-synthesizer responses.
    pub meta_max_tokens: u32,
    /// Maximum tokens for structured-output calls (analyzer, extractor).
    pub structured_max_tokens: u32,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
}

impl AssistantConfig {
    /// Creates a new builder for `AssistantConfig`.
    #[must_use]
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, Error> {
        Self::builder().from_env().build()
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v.to_lowercase() == "true")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Builder for [`AssistantConfig`].
#[derive(Debug, Clone, Default)]
pub struct AssistantConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    main_agent_model: Option<String>,
    specialist_model: Option<String>,
    meta_agent_model: Option<String>,
    query_analyzer_model: Option<String>,
    embedding_model: Option<String>,
    embedding_dimensions: Option<u32>,
    enable_parallel_agents: Option<bool>,
    min_domains_for_parallel: Option<usize>,
    parallel_execution_timeout: Option<Duration>,
    fallback_to_sequential: Option<bool>,
    enable_query_cache: Option<bool>,
    query_cache_ttl: Option<Duration>,
    max_tool_iterations: Option<usize>,
    search_limit: Option<usize>,
    agent_max_tokens: Option<u32>,
    meta_max_tokens: Option<u32>,
    structured_max_tokens: Option<u32>,
    prompt_dir: Option<PathBuf>,
}

impl AssistantConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("VIAJERO_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("VIAJERO_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("VIAJERO_BASE_URL"))
                .ok();
        }
        if self.main_agent_model.is_none() {
            self.main_agent_model = std::env::var("MAIN_AGENT_MODEL").ok();
        }
        if self.specialist_model.is_none() {
            self.specialist_model = std::env::var("SPECIALIZED_AGENTS_MODEL").ok();
        }
        if self.meta_agent_model.is_none() {
            self.meta_agent_model = std::env::var("META_AGENT_MODEL").ok();
        }
        if self.query_analyzer_model.is_none() {
            self.query_analyzer_model = std::env::var("QUERY_ANALYZER_MODEL").ok();
        }
        if self.embedding_model.is_none() {
            self.embedding_model = std::env::var("EMBEDDING_MODEL").ok();
        }
        if self.embedding_dimensions.is_none() {
            self.embedding_dimensions = env_parse("EMBEDDING_DIMENSIONS");
        }
        if self.enable_parallel_agents.is_none() {
            self.enable_parallel_agents = env_bool("ENABLE_PARALLEL_AGENTS");
        }
        if self.min_domains_for_parallel.is_none() {
            self.min_domains_for_parallel = env_parse("MIN_DOMAINS_FOR_PARALLEL");
        }
        if self.parallel_execution_timeout.is_none() {
            self.parallel_execution_timeout =
                env_parse("PARALLEL_EXECUTION_TIMEOUT").map(Duration::from_secs);
        }
        if self.fallback_to_sequential.is_none() {
            self.fallback_to_sequential = env_bool("FALLBACK_TO_SEQUENTIAL");
        }
        if self.enable_query_cache.is_none() {
            self.enable_query_cache = env_bool("ENABLE_QUERY_CACHE");
        }
        if self.query_cache_ttl.is_none() {
            self.query_cache_ttl = env_parse("QUERY_CACHE_TTL").map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("VIAJERO_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the general agent model.
    #[must_use]
    pub fn main_agent_model(mut self, model: impl Into<String>) -> Self {
        self.main_agent_model = Some(model.into());
        self
    }

    /// Sets the specialist agent model.
    #[must_use]
    pub fn specialist_model(mut self, model: impl Into<String>) -> Self {
        self.specialist_model = Some(model.into());
        self
    }

    /// Sets the meta-synthesizer model.
    #[must_use]
    pub fn meta_agent_model(mut self, model: impl Into<String>) -> Self {
        self.meta_agent_model = Some(model.into());
        self
    }

    /// Sets the query analyzer model.
    #[must_use]
    pub fn query_analyzer_model(mut self, model: impl Into<String>) -> Self {
        self.query_analyzer_model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the embedding dimensionality.
    #[must_use]
    pub const fn embedding_dimensions(mut self, n: u32) -> Self {
        self.embedding_dimensions = Some(n);
        self
    }

    /// Enables or disables parallel specialist execution.
    #[must_use]
    pub const fn enable_parallel_agents(mut self, enabled: bool) -> Self {
        self.enable_parallel_agents = Some(enabled);
        self
    }

    /// Sets the minimum detected domains for parallel execution.
    #[must_use]
    pub const fn min_domains_for_parallel(mut self, n: usize) -> Self {
        self.min_domains_for_parallel = Some(n);
        self
    }

    /// Sets the parallel batch deadline.
    #[must_use]
    pub const fn parallel_execution_timeout(mut self, timeout: Duration) -> Self {
        self.parallel_execution_timeout = Some(timeout);
        self
    }

    /// Enables or disables sequential fallback on orchestration errors.
    #[must_use]
    pub const fn fallback_to_sequential(mut self, enabled: bool) -> Self {
        self.fallback_to_sequential = Some(enabled);
        self
    }

    /// Enables or disables the query cache.
    #[must_use]
    pub const fn enable_query_cache(mut self, enabled: bool) -> Self {
        self.enable_query_cache = Some(enabled);
        self
    }

    /// Sets the query cache TTL.
    #[must_use]
    pub const fn query_cache_ttl(mut self, ttl: Duration) -> Self {
        self.query_cache_ttl = Some(ttl);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the similarity search result limit.
    #[must_use]
    pub const fn search_limit(mut self, n: usize) -> Self {
        self.search_limit = Some(n);
        self
    }

    /// Sets the general/specialist agent max tokens.
    #[must_use]
    pub const fn agent_max_tokens(mut self, n: u32) -> Self {
        self.agent_max_tokens = Some(n);
        self
    }

    /// Sets the meta-synthesizer max tokens.
    #[must_use]
    pub const fn meta_max_tokens(mut self, n: u32) -> Self {
        self.meta_max_tokens = Some(n);
        self
    }

    /// Sets the structured-output call max tokens.
    #[must_use]
    pub const fn structured_max_tokens(mut self, n: u32) -> Self {
        self.structured_max_tokens = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AssistantConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AssistantConfig, Error> {
        let api_key = self.api_key.ok_or(Error::ApiKeyMissing)?;

        Ok(AssistantConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            main_agent_model: self
                .main_agent_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            specialist_model: self
                .specialist_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            meta_agent_model: self
                .meta_agent_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            query_analyzer_model: self
                .query_analyzer_model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions: self
                .embedding_dimensions
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS),
            enable_parallel_agents: self.enable_parallel_agents.unwrap_or(true),
            min_domains_for_parallel: self
                .min_domains_for_parallel
                .unwrap_or(DEFAULT_MIN_DOMAINS_FOR_PARALLEL),
            parallel_execution_timeout: self
                .parallel_execution_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_PARALLEL_TIMEOUT_SECS)),
            fallback_to_sequential: self.fallback_to_sequential.unwrap_or(true),
            enable_query_cache: self.enable_query_cache.unwrap_or(false),
            query_cache_ttl: self
                .query_cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_QUERY_CACHE_TTL_SECS)),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            search_limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(DEFAULT_AGENT_MAX_TOKENS),
            meta_max_tokens: self.meta_max_tokens.unwrap_or(DEFAULT_META_MAX_TOKENS),
            structured_max_tokens: self
                .structured_max_tokens
                .unwrap_or(DEFAULT_STRUCTURED_MAX_TOKENS),
            prompt_dir: self.prompt_dir,
        })
    }
}
