//! Embedding service client.
//!
//! The canonical narrative text is embedded by an external
//! OpenAI-compatible embeddings endpoint. Failures propagate as
//! [`Error::Embedding`]; callers must never substitute a zero vector,
//! because a zero vector silently matches nothing in particular and
//! everything a little.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequest, EmbeddingInput};
use async_trait::async_trait;

use crate::config::AssistantConfig;
use crate::error::Error;

/// An embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds one text into a vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Embedding`] on service failure or an empty/
    /// dimension-mismatched response.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error>;
}

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
///
/// The base URL override makes this work against any compatible host
/// (the catalog uses 1024-dimension normalized `jina-clip-v2` vectors).
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: u32,
}

impl OpenAiEmbedder {
    /// Creates an embedder from assistant configuration.
    #[must_use]
    pub fn new(config: &AssistantConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            dimensions: Some(self.dimensions),
            ..Default::default()
        };

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| Error::Embedding {
                message: e.to_string(),
            })?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding {
                message: "embedding response contained no vectors".to_string(),
            })?;

        if vector.is_empty() {
            return Err(Error::Embedding {
                message: "embedding service returned an empty vector".to_string(),
            });
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_debug_hides_client() {
        let config = AssistantConfig::builder()
            .api_key("test")
            .embedding_model("jina-clip-v2")
            .embedding_dimensions(1024)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let embedder = OpenAiEmbedder::new(&config);
        let rendered = format!("{embedder:?}");
        assert!(rendered.contains("jina-clip-v2"));
        assert!(rendered.contains("1024"));
        assert!(!rendered.contains("test"));
    }
}
