//! Model-based query analyzer.
//!
//! Produces the orchestration decision for queries that pass the keyword
//! fast path. Response parsing degrades in three stages: structured
//! field extraction, then the first embedded object-like substring, then
//! the same keyword heuristic the fast path uses. Analysis never fails —
//! an unparsable or unreachable analyzer collapses to the heuristic.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::prompt::build_analyzer_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::config::AssistantConfig;
use crate::domain::{Domain, detect_domains, should_use_parallel};

/// Coarse complexity assessment of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// One domain, one constraint.
    Simple,
    /// A couple of constraints or an ambiguous domain.
    Moderate,
    /// Several domains or interdependent constraints.
    Complex,
}

/// The orchestration decision for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the query should fan out across specialists.
    pub should_parallelize: bool,
    /// Domains the query touches.
    pub domains: Vec<Domain>,
    /// Complexity assessment.
    pub complexity: Complexity,
}

/// Wire shape of the analyzer's verdict. Domains arrive as free strings
/// and are narrowed leniently; an invented domain never sinks the parse.
#[derive(Debug, Default, Deserialize)]
struct RawDecision {
    #[serde(default)]
    should_parallelize: bool,
    #[serde(default)]
    domains: Vec<String>,
    #[serde(default)]
    complexity: Option<Complexity>,
}

/// Builds a decision from the keyword heuristic alone.
#[must_use]
pub fn keyword_decision(query: &str, enabled: bool, min_domains: usize) -> Decision {
    let domains = detect_domains(query);
    Decision {
        should_parallelize: should_use_parallel(enabled, min_domains, &domains),
        complexity: if domains.len() > 1 {
            Complexity::Complex
        } else {
            Complexity::Simple
        },
        domains,
    }
}

/// Agent that produces a structured parallelization verdict.
pub struct QueryAnalyzer {
    model: String,
    max_tokens: u32,
    system_prompt: String,
    enable_parallel: bool,
    min_domains: usize,
}

impl QueryAnalyzer {
    /// Creates the analyzer from configuration and a prompt set.
    #[must_use]
    pub fn new(config: &AssistantConfig, analyzer_prompt: &str) -> Self {
        Self {
            model: config.query_analyzer_model.clone(),
            max_tokens: config.structured_max_tokens,
            system_prompt: analyzer_prompt.to_string(),
            enable_parallel: config.enable_parallel_agents,
            min_domains: config.min_domains_for_parallel,
        }
    }

    /// Analyzes a query, never failing.
    ///
    /// The model's verdict is additionally AND-ed with the keyword gate:
    /// the analyzer can veto parallel execution but never force it below
    /// the domain threshold.
    pub async fn analyze(&self, provider: &dyn LlmProvider, query: &str) -> Decision {
        let user_msg = build_analyzer_prompt(query);
        match self.execute(provider, &user_msg).await {
            Ok(response) => self.parse_decision(&response.content).map_or_else(
                || {
                    warn!("analyzer response unparsable, using keyword heuristic");
                    keyword_decision(query, self.enable_parallel, self.min_domains)
                },
                |decision| decision,
            ),
            Err(e) => {
                warn!(error = %e, "query analysis failed, using keyword heuristic");
                keyword_decision(query, self.enable_parallel, self.min_domains)
            }
        }
    }

    /// Parses a verdict: direct JSON first, then the first embedded
    /// object-like substring.
    fn parse_decision(&self, content: &str) -> Option<Decision> {
        let trimmed = content.trim();
        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        let raw: Option<RawDecision> = serde_json::from_str(json_str).ok().or_else(|| {
            Regex::new(r"(?s)\{.*\}")
                .ok()
                .and_then(|re| re.find(json_str))
                .and_then(|m| serde_json::from_str(m.as_str()).ok())
        });

        raw.map(|raw| self.narrow(raw))
    }

    /// Narrows a raw verdict into a typed, gated decision.
    fn narrow(&self, raw: RawDecision) -> Decision {
        let mut domains: Vec<Domain> = raw
            .domains
            .iter()
            .filter_map(|s| Domain::parse(s))
            .collect();
        domains.dedup();

        Decision {
            should_parallelize: raw.should_parallelize
                && should_use_parallel(self.enable_parallel, self.min_domains, &domains),
            complexity: raw.complexity.unwrap_or(Complexity::Moderate),
            domains,
        }
    }
}

#[async_trait]
impl Agent for QueryAnalyzer {
    fn name(&self) -> &str {
        "query_analyzer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::prompt::ANALYZER_SYSTEM_PROMPT;
    use crate::error::Error;

    fn analyzer(min_domains: usize) -> QueryAnalyzer {
        let config = AssistantConfig::builder()
            .api_key("test")
            .min_domains_for_parallel(min_domains)
            .build()
            .unwrap_or_else(|_| unreachable!());
        QueryAnalyzer::new(&config, ANALYZER_SYSTEM_PROMPT)
    }

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

    struct FailingProvider;

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, Error> {
            Err(Error::ApiRequest {
                message: "timeout".to_string(),
                status: None,
            })
        }
    }

    #[test]
    fn test_parse_direct_json() {
        let decision = analyzer(2)
            .parse_decision(
                r#"{"should_parallelize": true, "domains": ["lodging", "experiences"], "complexity": "complex"}"#,
            )
            .unwrap_or_else(|| unreachable!());
        assert!(decision.should_parallelize);
        assert_eq!(decision.domains, vec![Domain::Lodging, Domain::Experiences]);
        assert_eq!(decision.complexity, Complexity::Complex);
    }

    #[test]
    fn test_parse_embedded_object() {
        let content = r#"Here is my analysis:
{"should_parallelize": true, "domains": ["lodging", "transportation"], "complexity": "moderate"}
Hope that helps."#;
        let decision = analyzer(2)
            .parse_decision(content)
            .unwrap_or_else(|| unreachable!());
        assert!(decision.should_parallelize);
        assert_eq!(
            decision.domains,
            vec![Domain::Lodging, Domain::Transportation]
        );
    }

    #[test]
    fn test_parse_unknown_domains_skipped() {
        let decision = analyzer(2)
            .parse_decision(
                r#"{"should_parallelize": true, "domains": ["lodging", "weather"], "complexity": "simple"}"#,
            )
            .unwrap_or_else(|| unreachable!());
        // Only one recognized domain: the gate vetoes parallel.
        assert_eq!(decision.domains, vec![Domain::Lodging]);
        assert!(!decision.should_parallelize);
    }

    #[test]
    fn test_gate_overrides_model_verdict() {
        // The model says yes, but two domains are below a threshold of 3.
        let decision = analyzer(3)
            .parse_decision(
                r#"{"should_parallelize": true, "domains": ["lodging", "experiences"], "complexity": "complex"}"#,
            )
            .unwrap_or_else(|| unreachable!());
        assert!(!decision.should_parallelize);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(analyzer(2).parse_decision("no json here").is_none());
    }

    #[tokio::test]
    async fn test_unparsable_response_falls_back_to_keywords() {
        let provider = FixedProvider {
            content: "I think this query is complicated".to_string(),
        };
        let decision = analyzer(2)
            .analyze(&provider, "hotel y tour en Cancún")
            .await;
        assert_eq!(decision.domains, vec![Domain::Experiences, Domain::Lodging]);
        assert!(decision.should_parallelize);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_keywords() {
        let decision = analyzer(4)
            .analyze(&FailingProvider, "¿Qué hoteles hay en Playa del Carmen con piscina?")
            .await;
        assert_eq!(decision.domains, vec![Domain::Lodging]);
        assert!(!decision.should_parallelize);
        assert_eq!(decision.complexity, Complexity::Simple);
    }

    #[test]
    fn test_keyword_decision_complexity() {
        let single = keyword_decision("hoteles en Tulum", true, 4);
        assert_eq!(single.complexity, Complexity::Simple);

        let multi = keyword_decision("hotel, tour y transfer con precios", true, 4);
        assert_eq!(multi.complexity, Complexity::Complex);
        assert!(multi.should_parallelize);
    }

    #[test]
    fn test_analyzer_agent_properties() {
        let agent = analyzer(4);
        assert_eq!(agent.name(), "query_analyzer");
        assert!(agent.json_mode());
        assert!((agent.temperature() - 0.0).abs() < f32::EPSILON);
    }
}
