//! Domain specialist agents and the general-purpose agent.
//!
//! A specialist is a thin reasoning wrapper around exactly one retrieval
//! tool; the general agent carries all four tools and serves the
//! sequential path. Both are plain [`Agent`] implementations so the
//! orchestrator and runner depend only on the trait.

use async_trait::async_trait;

use super::prompt::PromptSet;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::Agent;
use crate::config::AssistantConfig;
use crate::domain::Domain;

/// A reasoning agent bound to one domain and one retrieval tool.
pub struct SpecialistAgent {
    domain: Domain,
    name: String,
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
}

impl SpecialistAgent {
    /// Creates the specialist for one domain.
    #[must_use]
    pub fn new(domain: Domain, config: &AssistantConfig, prompts: &PromptSet) -> Self {
        Self {
            domain,
            name: format!("{domain}_specialist"),
            model: config.specialist_model.clone(),
            max_tokens: config.agent_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: prompts.specialist(domain).to_string(),
        }
    }

    /// The domain this specialist serves.
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// Short human description for roster listings.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        self.domain.description()
    }
}

#[async_trait]
impl Agent for SpecialistAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::specialist_tools(self.domain).definitions().to_vec()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

/// The general-purpose agent used on the sequential path.
///
/// Carries all four tools, so a single reasoning loop can cover a
/// multi-domain query when parallel execution is off or has failed.
pub struct GeneralAgent {
    model: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    system_prompt: String,
}

impl GeneralAgent {
    /// Creates the general agent.
    #[must_use]
    pub fn new(config: &AssistantConfig, prompts: &PromptSet) -> Self {
        Self {
            model: config.main_agent_model.clone(),
            max_tokens: config.agent_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            system_prompt: prompts.general.clone(),
        }
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &str {
        "general_agent"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        ToolSet::general_tools().definitions().to_vec()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

/// Builds the full specialist roster in launch order.
#[must_use]
pub fn specialist_roster(config: &AssistantConfig, prompts: &PromptSet) -> Vec<SpecialistAgent> {
    Domain::ALL
        .into_iter()
        .map(|domain| SpecialistAgent::new(domain, config, prompts))
        .collect()
}
