//! Agent system for the travel-advisory core.
//!
//! Provides the hybrid orchestration workflow: a cheap domain detector
//! gates a model-based analyzer, which dispatches a query either to one
//! general-purpose agent or to concurrent domain specialists whose
//! labeled outputs are merged by a meta-synthesizer.
//!
//! # Architecture
//!
//! ```text
//! User query → HybridOrchestrator
//!   ├── detect_domains (keyword fast path)
//!   ├── QueryAnalyzer (model-based verdict, heuristic fallback)
//!   ├── sequential → GeneralAgent (all four tools, agentic loop)
//!   └── parallel   → ParallelAgentRunner
//!         ├── one task per SpecialistAgent (single tool each)
//!         ├── shared deadline + per-task grace, failure isolation
//!         └── MetaAgent → final synthesized answer
//! ```

pub mod agentic_loop;
pub mod analyzer;
pub mod client;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod runner;
pub mod specialist;
pub mod synthesizer;
pub mod tool;
pub mod traits;

// Re-export key types
pub use analyzer::{Complexity, Decision, QueryAnalyzer};
pub use client::create_provider;
pub use executor::{ToolDispatcher, ToolExecutor};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::HybridOrchestrator;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use runner::{AgentResult, AgentStatus, ParallelAgentRunner};
pub use specialist::{GeneralAgent, SpecialistAgent, specialist_roster};
pub use synthesizer::MetaAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, execute_with_tools};
