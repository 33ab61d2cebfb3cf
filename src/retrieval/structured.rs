//! Structured-data lookups: natural language → SQL → phrased answer.
//!
//! The `query_structured_data` tool goes through here instead of the
//! similarity pipeline: one reasoning call translates the question into
//! SQL against the catalog schema, the [`SqlOracle`] executes it, and a
//! second reasoning call phrases the rows for the user.

use std::sync::Arc;

use tracing::{debug, info};

use super::store::SqlOracle;
use crate::agent::message::{ChatRequest, system_message, user_message};
use crate::agent::provider::LlmProvider;
use crate::config::AssistantConfig;
use crate::error::Error;

/// Maximum rows handed to the phrasing call.
const MAX_PHRASED_ROWS: usize = 10;

/// Catalog schema description for the translation prompt.
const SCHEMA_INFO: &str = r"Tables:
- experiences(id, narrative_text, service_type, city, supplier_name, destination_name, duration)
- lodging(id, narrative_text, city, supplier_name, destination_name, price_range)
- transport(id, narrative_text, city, supplier_name, destination_name, duration)
- tariff_person_group(supplier_name, sellfits)";

/// System prompt for the NL-to-SQL translation call.
fn translate_system_prompt() -> String {
    format!(
        r"Eres un experto en SQL y bases de datos PostgreSQL.
Convierte preguntas en español a consultas SQL.
La base de datos tiene tablas para experiencias turísticas, alojamientos y transportes.

{SCHEMA_INFO}

REGLAS IMPORTANTES:
1. NUNCA incluyas columnas de vectores/embeddings en el SELECT (vector_embedding, embeddings, full_json, etc.)
2. Para la tabla 'experiences', intenta obtener el precio haciendo un LEFT JOIN con 'tariff_person_group' usando 'supplier_name'.
3. Usa ILIKE con '%término%' para búsquedas de texto.
4. Para nombres de lugares compuestos (ej. 'Xpu Ha'), reemplaza los espacios con '%' en la búsqueda (ej. '%Xpu%Ha%') para encontrar variaciones con guiones o espacios.

Responde SOLO con la consulta SQL, sin explicaciones ni formato markdown."
    )
}

/// System prompt for the row-phrasing call.
const PHRASE_SYSTEM_PROMPT: &str = r"Eres un asistente turístico amigable. Recibirás filas de una base de datos de productos turísticos en formato JSON.

Tu tarea:
1. Extraer la información relevante de las filas.
2. Presentarla de forma CONCISA en español.
3. Si hay más de 5 resultados, muestra solo los primeros 5 y menciona cuántos hay en total.
4. Por cada resultado: nombre, ubicación breve, descripción corta, duración, precio si están disponibles.
5. No mencionar campos técnicos (id, embeddings, json, etc.).
6. Formato: lista numerada, cada item máximo 3-4 líneas.";

/// Natural-language lookups against the structured catalog.
pub struct StructuredQueryService {
    provider: Arc<dyn LlmProvider>,
    oracle: Arc<dyn SqlOracle>,
    model: String,
    max_tokens: u32,
}

impl StructuredQueryService {
    /// Creates the service over a provider and a SQL oracle.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        oracle: Arc<dyn SqlOracle>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            provider,
            oracle,
            model: config.query_analyzer_model.clone(),
            max_tokens: config.meta_max_tokens,
        }
    }

    /// Answers a natural-language data question.
    ///
    /// Returns `Ok(None)` when the query executed but matched nothing —
    /// callers phrase that as "found nothing", which must stay distinct
    /// from execution failures.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] on translation, execution, or phrasing failures.
    pub async fn answer(&self, nl_query: &str) -> Result<Option<String>, Error> {
        let sql = self.translate(nl_query).await?;
        debug!(sql = %sql, "translated structured query");

        let rows = self.oracle.execute(&sql).await?;
        if rows.is_empty() {
            info!("structured query matched no rows");
            return Ok(None);
        }

        let total = rows.len();
        let shown = &rows[..total.min(MAX_PHRASED_ROWS)];
        let rows_json = serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());

        let mut user_prompt = format!(
            "El usuario preguntó: \"{nl_query}\"\n\n\
             Los resultados de la base de datos son:\n{rows_json}"
        );
        if total > MAX_PHRASED_ROWS {
            user_prompt.push_str(&format!(
                "\n\nNota: Solo se muestran los primeros {MAX_PHRASED_ROWS} de {total} resultados."
            ));
        }
        user_prompt.push_str("\n\nPresenta esta información de forma natural y útil para el usuario.");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![system_message(PHRASE_SYSTEM_PROMPT), user_message(&user_prompt)],
            temperature: Some(0.7),
            max_tokens: Some(self.max_tokens),
            json_mode: false,
            tools: Vec::new(),
        };
        let response = self.provider.chat(&request).await?;
        Ok(Some(response.content.trim().to_string()))
    }

    /// Translates the question into SQL.
    async fn translate(&self, nl_query: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                system_message(&translate_system_prompt()),
                user_message(nl_query),
            ],
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            json_mode: false,
            tools: Vec::new(),
        };
        let response = self.provider.chat(&request).await?;
        let sql = response
            .content
            .replace("```sql", "")
            .replace("```", "")
            .trim()
            .to_string();
        if sql.is_empty() {
            return Err(Error::StructuredData {
                message: "translation produced an empty query".to_string(),
            });
        }
        Ok(sql)
    }
}

impl std::fmt::Debug for StructuredQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredQueryService")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
