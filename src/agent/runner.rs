//! Parallel specialist execution.
//!
//! Launches one task per specialist, awaits the batch under a single
//! deadline, and hands the labeled successful outputs to the
//! meta-synthesizer. Failure isolation is the core invariant: one
//! specialist erroring or timing out never aborts the others, and
//! partial results are always preferred over total failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use super::executor::ToolDispatcher;
use super::provider::LlmProvider;
use super::specialist::SpecialistAgent;
use super::synthesizer::MetaAgent;
use super::traits::{Agent, execute_with_tools};
use crate::error::Error;

/// Grace period granted per unresolved task after the batch deadline.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Canned output recorded for a specialist that outlived the grace period.
const TIMEOUT_MESSAGE: &str = "Agent execution timed out";

/// Answer returned when every specialist failed.
const NO_RESULTS_MESSAGE: &str = "Lo siento, no pude encontrar información específica \
     para tu consulta en este momento. Por favor, intenta de nuevo más tarde.";

/// Outcome status of one specialist task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    /// The specialist produced an answer.
    Success,
    /// The specialist raised an error (isolated, logged, excluded).
    Error,
    /// The specialist did not resolve within deadline + grace.
    Timeout,
}

impl AgentStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Result of one specialist task.
#[derive(Debug, Clone)]
pub struct AgentResult {
    /// Specialist name (used as the section label).
    pub specialist: String,
    /// Outcome status.
    pub status: AgentStatus,
    /// Output text, or the error/timeout message.
    pub output: String,
    /// Elapsed time for this task.
    pub elapsed: Duration,
}

/// Runs a fixed roster of specialists concurrently and synthesizes
/// their labeled outputs.
pub struct ParallelAgentRunner {
    specialists: Vec<Arc<SpecialistAgent>>,
    meta: MetaAgent,
    timeout: Duration,
}

impl ParallelAgentRunner {
    /// Creates a runner over a specialist roster and a meta-synthesizer.
    #[must_use]
    pub fn new(specialists: Vec<SpecialistAgent>, meta: MetaAgent, timeout: Duration) -> Self {
        Self {
            specialists: specialists.into_iter().map(Arc::new).collect(),
            meta,
            timeout,
        }
    }

    /// Number of specialists in the roster.
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.specialists.len()
    }

    /// Runs every specialist against the query and collects per-task
    /// results over a fan-in channel.
    ///
    /// Tasks launch in roster order but results arrive in completion
    /// order; downstream section ordering inherits that nondeterminism,
    /// which is fine because the meta-synthesizer re-groups by relevance.
    /// After the shared deadline elapses, every unresolved task gets one
    /// [`TIMEOUT_GRACE`] receive window for a best-effort result before
    /// being recorded as a timeout. Abandonment means "stop waiting":
    /// the task keeps running detached until its remote call returns,
    /// but nobody is listening — the underlying call has no cancellation
    /// primitive.
    pub async fn execute_batch(
        &self,
        provider: &Arc<dyn LlmProvider>,
        dispatcher: &Arc<dyn ToolDispatcher>,
        query: &str,
    ) -> Vec<AgentResult> {
        info!(
            specialists = self.specialists.len(),
            "running specialists in parallel"
        );

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AgentResult>();
        let mut pending: Vec<String> = Vec::with_capacity(self.specialists.len());

        for specialist in &self.specialists {
            let specialist = Arc::clone(specialist);
            let provider = Arc::clone(provider);
            let dispatcher = Arc::clone(dispatcher);
            let query = query.to_string();
            let tx = tx.clone();
            pending.push(specialist.name().to_string());
            tokio::spawn(async move {
                let result = run_single(&specialist, &provider, &dispatcher, &query).await;
                // The receiver may have stopped waiting; that is fine.
                let _ = tx.send(result);
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.timeout;
        let mut results = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(result)) => {
                    pending.retain(|name| name != &result.specialist);
                    results.push(result);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout_secs = self.timeout.as_secs(),
                        unresolved = pending.len(),
                        "parallel execution timeout, granting grace periods"
                    );
                    break;
                }
            }
        }

        // One short grace window per still-unresolved task.
        for _ in 0..pending.len() {
            if let Ok(Some(result)) = tokio::time::timeout(TIMEOUT_GRACE, rx.recv()).await {
                pending.retain(|name| name != &result.specialist);
                results.push(result);
            }
        }

        for name in pending {
            warn!(specialist = %name, "specialist abandoned after grace period");
            results.push(AgentResult {
                specialist: name,
                status: AgentStatus::Timeout,
                output: TIMEOUT_MESSAGE.to_string(),
                elapsed: self.timeout + TIMEOUT_GRACE,
            });
        }

        results
    }

    /// Executes the batch and synthesizes the successful sections.
    ///
    /// Failed and timed-out specialists are logged with their status and
    /// excluded from the text handed to the meta-synthesizer. If no
    /// specialist succeeded, the user is told no specific information
    /// could be found; synthesizing over an empty section set would only
    /// invite fabrication.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if the meta-synthesizer call itself fails.
    pub async fn run_parallel(
        &self,
        provider: &Arc<dyn LlmProvider>,
        dispatcher: &Arc<dyn ToolDispatcher>,
        query: &str,
    ) -> Result<String, Error> {
        let results = self.execute_batch(provider, dispatcher, query).await;

        let mut sections = Vec::with_capacity(results.len());
        for result in &results {
            if result.status == AgentStatus::Success {
                sections.push(format!("### {}\n{}\n", result.specialist, result.output));
            } else {
                warn!(
                    specialist = %result.specialist,
                    status = result.status.as_str(),
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    output = %result.output,
                    "specialist excluded from synthesis"
                );
            }
        }

        if sections.is_empty() {
            warn!("all specialists failed, returning no-results answer");
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        info!(
            sections = sections.len(),
            "passing aggregated results to meta-agent"
        );
        let response = self.meta.synthesize(&**provider, query, &sections).await?;
        Ok(response.content)
    }
}

impl std::fmt::Debug for ParallelAgentRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelAgentRunner")
            .field("specialists", &self.specialists.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Runs one specialist, converting every failure into an [`AgentResult`].
async fn run_single(
    specialist: &SpecialistAgent,
    provider: &Arc<dyn LlmProvider>,
    dispatcher: &Arc<dyn ToolDispatcher>,
    query: &str,
) -> AgentResult {
    let name = specialist.name().to_string();
    let start = Instant::now();
    info!(specialist = %name, "starting parallel agent");

    match execute_with_tools(specialist, &**provider, query, &**dispatcher).await {
        Ok(response) => {
            let elapsed = start.elapsed();
            info!(
                specialist = %name,
                elapsed_ms = elapsed.as_millis() as u64,
                "completed parallel agent"
            );
            AgentResult {
                specialist: name,
                status: AgentStatus::Success,
                output: response.content,
                elapsed,
            }
        }
        Err(e) => {
            let elapsed = start.elapsed();
            error!(specialist = %name, error = %e, "error in parallel agent");
            AgentResult {
                specialist: name,
                status: AgentStatus::Error,
                output: format!("Error: {e}"),
                elapsed,
            }
        }
    }
}
