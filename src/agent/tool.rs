//! Tool type definitions for internal function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results.
//! Tools expose the retrieval pipeline and the structured-data lookup as
//! function-calling targets for LLM agents.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::Domain;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the dispatch table in the executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (formatted text on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions scoped to an agent role.
///
/// Different agents get different subsets:
/// - General agent: all four tools (`get_experiences`, `get_lodging`,
///   `get_transportation`, `query_structured_data`)
/// - Specialist agents: exactly the one tool of their domain
/// - Meta-synthesizer / query analyzer: no tools
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set for the general-purpose agent: all four travel tools.
    #[must_use]
    pub fn general_tools() -> Self {
        Self {
            definitions: vec![
                def_get_experiences(),
                def_get_lodging(),
                def_get_transportation(),
                def_query_structured_data(),
            ],
        }
    }

    /// The single tool bound to a domain specialist.
    #[must_use]
    pub fn specialist_tools(domain: Domain) -> Self {
        let definition = match domain {
            Domain::Experiences => def_get_experiences(),
            Domain::Lodging => def_get_lodging(),
            Domain::Transportation => def_get_transportation(),
            Domain::Database => def_query_structured_data(),
        };
        Self {
            definitions: vec![definition],
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

fn text_param_schema(name: &str, description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            name: {
                "type": "string",
                "description": description
            }
        },
        "required": [name],
        "additionalProperties": false
    })
}

/// Defines the `get_experiences` tool.
fn def_get_experiences() -> ToolDefinition {
    ToolDefinition {
        name: "get_experiences".to_string(),
        description: "Get experience recommendations from the knowledge base.".to_string(),
        parameters: text_param_schema(
            "location_and_activity_preferences",
            "The location, activity type, dates, preferences, budget, and any \
             specific experience requirements from the user's request.",
        ),
    }
}

/// Defines the `get_lodging` tool.
fn def_get_lodging() -> ToolDefinition {
    ToolDefinition {
        name: "get_lodging".to_string(),
        description: "Get lodging recommendations from the knowledge base.".to_string(),
        parameters: text_param_schema(
            "location_and_preferences",
            "The location, dates, preferences, budget, and any specific lodging \
             requirements from the user's request.",
        ),
    }
}

/// Defines the `get_transportation` tool.
fn def_get_transportation() -> ToolDefinition {
    ToolDefinition {
        name: "get_transportation".to_string(),
        description: "Get transportation options from the knowledge base.".to_string(),
        parameters: text_param_schema(
            "route_and_preferences",
            "The origin, destination, dates, travel preferences, budget, and any \
             specific transportation requirements from the user's request.",
        ),
    }
}

/// Defines the `query_structured_data` tool.
fn def_query_structured_data() -> ToolDefinition {
    ToolDefinition {
        name: "query_structured_data".to_string(),
        description: "Answer availability, price, and detail questions by querying \
                      the structured product database directly."
            .to_string(),
        parameters: text_param_schema(
            "natural_language_query",
            "The user's question, in natural language, about availability, prices, \
             dates, or specific product details.",
        ),
    }
}
