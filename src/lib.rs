//! viajero-rs: conversational travel-advisory assistant core.
//!
//! Answers free-text questions about experiences, lodging, and
//! transportation by retrieving matching catalog records via semantic
//! search and phrasing them through LLM agents.
//!
//! # Architecture
//!
//! ```text
//! query → chat service (history, never-raise boundary)
//!   └── HybridOrchestrator
//!         ├── keyword domain detector (fast path)
//!         ├── model-based query analyzer
//!         ├── sequential: GeneralAgent + four retrieval tools
//!         └── parallel: ParallelAgentRunner → MetaAgent
//!               └── specialists → RetrievalPipeline
//!                     (narrative → embedding → filter fallback chain)
//! ```
//!
//! The vector datastore and the SQL catalog are black-box oracles behind
//! the [`retrieval::VectorStore`] and [`retrieval::SqlOracle`] traits.

pub mod agent;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod retrieval;
pub mod service;

pub use agent::{HybridOrchestrator, MetaAgent, ParallelAgentRunner};
pub use config::{AssistantConfig, AssistantConfigBuilder};
pub use domain::{Domain, detect_domains, should_use_parallel};
pub use error::Error;
pub use history::{ConversationId, ConversationStore};
pub use retrieval::{MemoryStore, RetrievalPipeline};
pub use service::{ChatMode, ChatService, ChatTurn};
