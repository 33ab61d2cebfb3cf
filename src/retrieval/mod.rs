//! Retrieval core: structured intent extraction, embedding, filtered
//! similarity search with progressive fallback, and record formatting.
//!
//! ```text
//! query → NarrativeAgent (structured intent)
//!       → canonical text → Embedder
//!       → strategy_chain: most specific filters first
//!           └── VectorStore similarity search per strategy
//!       → terminal result set → per-domain formatter
//! ```

pub mod embedding;
pub mod filters;
pub mod format;
pub mod narrative;
pub mod pipeline;
pub mod region;
pub mod store;
pub mod structured;

pub use embedding::{Embedder, OpenAiEmbedder};
pub use filters::{FilterSet, FilterStrategy, MatchKind, strategy_chain};
pub use narrative::{Narrative, NarrativeAgent, PriceRange};
pub use pipeline::{Retrieval, RetrievalPipeline};
pub use region::StateCode;
pub use store::{MemoryStore, RetrievalRecord, SqlOracle, StoredRecord, VectorStore};
pub use structured::StructuredQueryService;
