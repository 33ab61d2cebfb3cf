//! Meta-synthesizer agent.
//!
//! Takes the labeled sections produced by the parallel specialists and
//! merges them into one coherent, non-redundant answer. No state; purely
//! a transform over its input text.

use async_trait::async_trait;

use super::prompt::{PromptSet, build_meta_prompt};
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::config::AssistantConfig;
use crate::error::Error;

/// Agent that merges labeled specialist sections into a final answer.
pub struct MetaAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl MetaAgent {
    /// Creates the meta-synthesizer from configuration and prompts.
    #[must_use]
    pub fn new(config: &AssistantConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.meta_agent_model.clone(),
            max_tokens: config.meta_max_tokens,
            system_prompt: prompts.meta.clone(),
        }
    }

    /// Synthesizes labeled sections into one answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] on API failures.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        sections: &[String],
    ) -> Result<AgentResponse, Error> {
        let user_msg = build_meta_prompt(query, sections);
        self.execute(provider, &user_msg).await
    }
}

#[async_trait]
impl Agent for MetaAgent {
    fn name(&self) -> &str {
        "meta_agent"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::PromptSet;

    #[test]
    fn test_agent_properties() {
        let config = AssistantConfig::builder()
            .api_key("test")
            .meta_agent_model("gpt-4o")
            .meta_max_tokens(8192)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let agent = MetaAgent::new(&config, &PromptSet::defaults());
        assert_eq!(agent.name(), "meta_agent");
        assert_eq!(agent.model(), "gpt-4o");
        assert!(!agent.json_mode());
        assert!((agent.temperature() - 0.1).abs() < f32::EPSILON);
        assert_eq!(agent.max_tokens(), 8192);
        assert!(agent.tools().is_empty());
    }
}
