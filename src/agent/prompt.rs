//! System prompts and template builders for agents.
//!
//! Prompts are the core instructions that define each agent's behavior.
//! Template builders format user messages with query context and labeled
//! specialist output.

use std::fmt::Write;
use std::path::Path;

use crate::domain::Domain;

/// Formatting rules shared by every user-facing agent.
///
/// The calling chat surface renders a lightweight markup: single-asterisk
/// bold, underscore italic, backtick code, and `•` bullets. Double
/// asterisks render literally, so they are banned outright.
pub const CHAT_MARKUP_GUIDE: &str = r"IMPORTANT: Format responses with chat markup:
- For *bold* text use single asterisks: *text* (not double)
- For _italic_ text use underscores: _text_
- For `code` use backticks
- For ordered lists use numbers: 1. item
- For unordered lists use bullet points: • item
- NEVER use ** for bold, use * instead.";

/// System prompt for the general-purpose (sequential) agent.
pub const GENERAL_SYSTEM_PROMPT: &str = r"You are a helpful travel assistant for a tour operator. You answer questions about experiences, lodging, and transportation using your knowledge-base tools.

## Instructions

1. If the user's request is clear, call the matching tool directly: get_experiences for activities and tours, get_lodging for accommodation, get_transportation for transfers and routes, query_structured_data for availability, price, and detail lookups.
2. If the request spans several of those areas, call each relevant tool once.
3. Ask a short clarifying question only when the location or the kind of service is genuinely unclear.
4. Answer in the user's language (usually Spanish). Be friendly, conversational, and concise.

## Response Guidelines

- Provide BRIEF, FOCUSED responses based on the user's specific requirements.
- Show ONLY the information the user asked for.
- Order results by price when the user mentions price-focused terms (barato, económico).
- Hide contact and banking data unless specifically requested.
- Include age range, private/shared status, and product code when presenting a product.
- When a tool reports nearby alternatives instead of exact matches, say so and explain why the alternatives are close (similar activity, nearby location, matching price range).

IMPORTANT: Format responses with chat markup:
- For *bold* text use single asterisks: *text* (not double)
- For _italic_ text use underscores: _text_
- For `code` use backticks
- For ordered lists use numbers: 1. item
- For unordered lists use bullet points: • item
- NEVER use ** for bold, use * instead.";

/// System prompt for the meta-synthesizer.
pub const META_SYSTEM_PROMPT: &str = r"You merge labeled sections written by domain specialist agents (experiences, lodging, transportation, data lookups) into one coherent answer for a traveler.

## Instructions

1. Read every labeled section.
2. Merge them into a single, non-redundant response ordered by relevance to the user's request, not by section order.
3. Preserve cross-section links: if an accommodation sits near a recommended activity, or a transfer connects to a listed hotel, keep those connections visible.
4. Drop duplicated information; keep the most specific version.
5. If no sections contain specific results, say clearly that no specific information could be found and suggest how to refine the request.
6. Answer in the user's language (usually Spanish).

IMPORTANT: Format responses with chat markup:
- For *bold* text use single asterisks: *text* (not double)
- For unordered lists use bullet points: • item
- NEVER use ** for bold, use * instead.";

/// System prompt for the query analyzer.
pub const ANALYZER_SYSTEM_PROMPT: &str = r#"You are a query routing expert for a travel assistant. You decide whether a user query would benefit from being split across parallel domain specialists.

## Output Format (JSON)

Return ONLY a JSON object:
```json
{
  "should_parallelize": true | false,
  "domains": ["experiences", "lodging", "transportation", "database"],
  "complexity": "simple" | "moderate" | "complex"
}
```

## Guidelines

- should_parallelize is true only when the query genuinely covers multiple domains.
- domains lists every domain the query touches, from the closed set above.
- complexity: "simple" for one domain and one constraint, "complex" for several domains or interdependent constraints, otherwise "moderate".

Example: "Dame hoteles y experiencias en Cancún" -> {"should_parallelize": true, "domains": ["lodging", "experiences"], "complexity": "moderate"}"#;

/// System prompt for off mode, where the assistant runs without its
/// knowledge-base tools.
pub const OFF_MODE_SYSTEM_PROMPT: &str = r"Eres un asistente de viajes amigable. Estás en modo limitado y no tienes acceso a la base de conocimiento, así que responde de forma extremadamente concisa y general, sin inventar productos concretos.

IMPORTANT: Format responses with chat markup:
- For *bold* text use single asterisks: *text* (not double)
- For unordered lists use bullet points: • item
- NEVER use ** for bold, use * instead.";

/// Per-domain specialist routine, appended to the shared markup guide.
const fn specialist_routine(domain: Domain) -> &'static str {
    match domain {
        Domain::Experiences => {
            r"You are an experiences specialist for a travel assistant. The user may pass a provider name only; use the tool to look it up.

# Routine
1. Extract the location, activity type, and preferences from the query.
2. Call get_experiences with them and format the response to the user's specific request.
3. If the tool reports nearby alternatives instead of exact matches, present them and explain why (similar activity, close location, price range).

# Response Guidelines
- Brief, focused answers; only the information the user asked for.
- Order by price when price-focused terms appear (barato, económico).
- Include age range, private/shared status, and product code.
- Hide contact and banking data unless specifically requested."
        }
        Domain::Lodging => {
            r"You are a lodging specialist for a travel assistant. The user may pass a provider name only; use the tool to look it up.

# Routine
1. Extract the location, dates, budget, and preferences from the query.
2. Call get_lodging with them and format the response to the user's specific request.
3. If the tool reports nearby alternatives instead of exact matches, present them and explain why.

# Response Guidelines
- Brief, focused answers; only the information the user asked for.
- Order by price when price-focused terms appear (barato, económico).
- Include price range, age range, and product code.
- Hide contact and banking data unless specifically requested."
        }
        Domain::Transportation => {
            r"You are a transportation specialist for a travel assistant. The user may pass a provider name only; use the tool to look it up.

# Routine
1. Extract the origin, destination, dates, and preferences from the query.
2. Call get_transportation with them and format the response to the user's specific request.
3. If there is no exact route match, offer alternative routes or transport options.

# Response Guidelines
- Brief, focused answers; only the information the user asked for.
- Include vehicle options with capacity, private/shared status, and product code.
- Order by price when price-focused terms appear.
- Hide contact and banking data unless specifically requested."
        }
        Domain::Database => {
            r"You are a data lookup specialist for a travel assistant. You answer availability, price, date, and detail questions.

# Routine
1. Restate the user's question as a clear natural-language data query.
2. Call query_structured_data with it.
3. Present the rows the tool returns; never invent values that are not in the result.

# Response Guidelines
- Brief, focused answers; only the information the user asked for.
- If the lookup returns nothing, say so plainly and suggest refining the question."
        }
    }
}

/// Builds the full system prompt for a domain specialist.
#[must_use]
pub fn specialist_system_prompt(domain: Domain) -> String {
    format!("{}\n\n{CHAT_MARKUP_GUIDE}", specialist_routine(domain))
}

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/viajero-rs/prompts";

/// Filenames for each prompt template.
const GENERAL_FILENAME: &str = "general.md";
/// Filename for the meta-synthesizer prompt template.
const META_FILENAME: &str = "meta.md";
/// Filename for the query analyzer prompt template.
const ANALYZER_FILENAME: &str = "analyzer.md";

/// A set of system prompts for all agents.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from configuration, environment, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the general-purpose agent.
    pub general: String,
    /// System prompt for the meta-synthesizer.
    pub meta: String,
    /// System prompt for the query analyzer.
    pub analyzer: String,
    /// System prompts per specialist domain, in [`Domain::ALL`] order.
    pub specialists: Vec<(Domain, String)>,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument (from configuration)
    /// 2. `VIAJERO_PROMPT_DIR` environment variable
    /// 3. `~/.config/viajero-rs/prompts/`
    ///
    /// Each file is loaded independently — a missing file uses its default.
    /// Specialist overrides use `<domain>.md` filenames.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("VIAJERO_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let load_file = |filename: &str, default: String| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or(default)
        };

        Self {
            general: load_file(GENERAL_FILENAME, GENERAL_SYSTEM_PROMPT.to_string()),
            meta: load_file(META_FILENAME, META_SYSTEM_PROMPT.to_string()),
            analyzer: load_file(ANALYZER_FILENAME, ANALYZER_SYSTEM_PROMPT.to_string()),
            specialists: Domain::ALL
                .into_iter()
                .map(|d| {
                    let filename = format!("{}.md", d.as_str());
                    (d, load_file(&filename, specialist_system_prompt(d)))
                })
                .collect(),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            general: GENERAL_SYSTEM_PROMPT.to_string(),
            meta: META_SYSTEM_PROMPT.to_string(),
            analyzer: ANALYZER_SYSTEM_PROMPT.to_string(),
            specialists: Domain::ALL
                .into_iter()
                .map(|d| (d, specialist_system_prompt(d)))
                .collect(),
        }
    }

    /// The system prompt for one specialist domain.
    #[must_use]
    pub fn specialist(&self, domain: Domain) -> &str {
        self.specialists
            .iter()
            .find(|(d, _)| *d == domain)
            .map_or(GENERAL_SYSTEM_PROMPT, |(_, p)| p.as_str())
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for the query analyzer.
#[must_use]
pub fn build_analyzer_prompt(query: &str) -> String {
    format!(
        "Analyze this user query and determine if it would benefit from \
         parallel processing across travel domains.\n\n\
         Query: \"{query}\"\n\n\
         Return the JSON verdict."
    )
}

/// Builds the user message for the meta-synthesizer from labeled sections.
///
/// Sections arrive in specialist completion order; the synthesizer
/// re-groups by relevance, so section order carries no meaning.
#[must_use]
pub fn build_meta_prompt(query: &str, sections: &[String]) -> String {
    let mut prompt = format!("<query>{query}</query>\n\n<specialist_sections>\n");
    for section in sections {
        let _ = writeln!(prompt, "{section}");
    }
    prompt.push_str("</specialist_sections>\n\nMerge these sections into one answer.");
    prompt
}
