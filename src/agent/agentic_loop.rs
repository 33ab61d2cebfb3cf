//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached.

use tracing::debug;

use super::executor::ToolDispatcher;
use super::message::{ChatRequest, ChatResponse, assistant_tool_calls_message, tool_message};
use super::provider::LlmProvider;
use crate::error::Error;

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Continues until the model responds without tool calls (i.e., it produces
/// a final text answer) or `max_iterations` is reached.
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `dispatcher` - Executes tool calls against the retrieval core.
/// * `max_iterations` - Safety limit on round-trips.
///
/// # Returns
///
/// The final [`ChatResponse`] containing the model's text answer and usage
/// from the last call.
///
/// # Errors
///
/// Returns [`Error::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates any provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    dispatcher: &dyn ToolDispatcher,
    max_iterations: usize,
) -> Result<ChatResponse, Error> {
    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;

        // If no tool calls, we have a final answer
        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            return Ok(response);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        // Append the assistant message with tool calls
        request
            .messages
            .push(assistant_tool_calls_message(response.tool_calls.clone()));

        // Execute each tool call and append results
        for call in &response.tool_calls {
            let result = dispatcher.execute(call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(Error::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{TokenUsage, system_message, user_message};
    use crate::agent::tool::{ToolCall, ToolResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    /// Mock provider that returns tool calls on the first N calls,
    /// then a final text response.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
    }

    impl MockToolProvider {
        const fn new(tool_rounds: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, Error> {
            let count = self.call_count.fetch_add(1, Ordering::SeqCst);
            if count < self.tool_rounds {
                Ok(ChatResponse {
                    content: String::new(),
                    usage: TokenUsage::default(),
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: "get_lodging".to_string(),
                        arguments: r#"{"location_and_preferences": "Tulum"}"#.to_string(),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: "final answer".to_string(),
                    usage: TokenUsage::default(),
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }
    }

    /// Dispatcher that returns a canned result for every call.
    struct StubDispatcher;

    #[async_trait]
    impl ToolDispatcher for StubDispatcher {
        async fn execute(&self, call: &ToolCall) -> ToolResult {
            ToolResult {
                tool_call_id: call.id.clone(),
                content: "stub result".to_string(),
                is_error: false,
            }
        }
    }

    fn base_request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![system_message("system"), user_message("user")],
            temperature: Some(0.0),
            max_tokens: Some(100),
            json_mode: false,
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_loop_terminates_on_text_response() {
        let provider = MockToolProvider::new(0);
        let mut request = base_request();
        let response = agentic_loop(&provider, &mut request, &StubDispatcher, 5)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.content, "final answer");
        // No tool messages appended.
        assert_eq!(request.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_loop_appends_tool_round_trip() {
        let provider = MockToolProvider::new(2);
        let mut request = base_request();
        let response = agentic_loop(&provider, &mut request, &StubDispatcher, 5)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.content, "final answer");
        // Two rounds: each adds one assistant message + one tool message.
        assert_eq!(request.messages.len(), 6);
        assert!(request.messages[3].content.contains("stub result"));
    }

    #[tokio::test]
    async fn test_loop_exceeds_iterations() {
        let provider = MockToolProvider::new(10);
        let mut request = base_request();
        let result = agentic_loop(&provider, &mut request, &StubDispatcher, 3).await;
        assert!(matches!(
            result,
            Err(Error::ToolLoopExceeded { max_iterations: 3 })
        ));
    }
}
