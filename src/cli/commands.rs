//! CLI command implementations.
//!
//! Thin wiring from parsed arguments to the chat service; all domain
//! logic lives in the library.
#![allow(clippy::print_stdout)]

use std::io::BufRead;
use std::sync::Arc;

use async_trait::async_trait;

use super::parser::{Cli, Commands};
use crate::config::AssistantConfig;
use crate::domain::{detect_domains, should_use_parallel};
use crate::error::Error;
use crate::retrieval::store::{MemoryStore, SqlOracle};
use crate::service::{ChatMode, ChatService, ChatTurn};

/// SQL oracle used when no catalog backend is wired: every structured
/// lookup reports no rows.
struct OfflineOracle;

#[async_trait]
impl SqlOracle for OfflineOracle {
    async fn execute(&self, _sql: &str) -> Result<Vec<serde_json::Value>, Error> {
        Ok(Vec::new())
    }
}

/// Executes the parsed CLI command.
///
/// # Errors
///
/// Returns [`Error`] on configuration or seed-loading failures; chat
/// turns themselves never raise.
pub async fn execute(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Commands::Chat {
            query,
            channel,
            thread,
            off,
            no_parallel,
            name,
        } => {
            let config = AssistantConfig::from_env()?;
            let store = match cli.data {
                Some(path) => {
                    let json =
                        std::fs::read_to_string(&path).map_err(|e| Error::Search {
                            message: format!("failed to read seed {}: {e}", path.display()),
                        })?;
                    MemoryStore::from_json(&json)?
                }
                None => MemoryStore::new(),
            };
            let service =
                ChatService::new(config, Arc::new(store), Arc::new(OfflineOracle))?;

            let turn_template = ChatTurn {
                query: String::new(),
                channel,
                thread,
                mode: if off { ChatMode::Off } else { ChatMode::On },
                display_name: name,
                use_parallel: !no_parallel,
            };

            match query {
                Some(query) => {
                    let answer = service
                        .chat(ChatTurn {
                            query,
                            ..turn_template
                        })
                        .await;
                    println!("{answer}");
                }
                None => run_repl(&service, &turn_template).await,
            }
            Ok(())
        }

        Commands::Detect { query } => {
            let config = AssistantConfig::from_env().ok();
            let (enabled, min_domains) = config
                .as_ref()
                .map_or((true, 4), |c| (c.enable_parallel_agents, c.min_domains_for_parallel));
            let domains = detect_domains(&query);
            let parallel = should_use_parallel(enabled, min_domains, &domains);
            println!("query: {query}");
            println!(
                "domains: [{}]",
                domains
                    .iter()
                    .map(|d| d.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("use parallel: {parallel}");
            Ok(())
        }

        Commands::Config => {
            let config = AssistantConfig::from_env()?;
            println!("provider: {}", config.provider);
            println!("main agent model: {}", config.main_agent_model);
            println!("specialist model: {}", config.specialist_model);
            println!("meta agent model: {}", config.meta_agent_model);
            println!("query analyzer model: {}", config.query_analyzer_model);
            println!(
                "embedding: {} ({} dims)",
                config.embedding_model, config.embedding_dimensions
            );
            println!("parallel agents: {}", config.enable_parallel_agents);
            println!("min domains for parallel: {}", config.min_domains_for_parallel);
            println!(
                "parallel timeout: {}s",
                config.parallel_execution_timeout.as_secs()
            );
            println!("fallback to sequential: {}", config.fallback_to_sequential);
            println!("query cache: {}", config.enable_query_cache);
            Ok(())
        }
    }
}

/// Reads queries from stdin until EOF, one turn per line.
async fn run_repl(service: &ChatService, template: &ChatTurn) {
    println!("viajero-rs - escribe tu pregunta (Ctrl-D para salir)");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let answer = service
            .chat(ChatTurn {
                query: query.to_string(),
                ..template.clone()
            })
            .await;
        println!("{answer}\n");
    }
}
