//! Structured narrative extraction from free-text queries.
//!
//! One reasoning call maps the user's query into a fixed schema; the
//! non-blank fields are then linearized into a canonical text block used
//! as the embedding input. Canonicalization means semantically identical
//! intents embed to the same vector regardless of original phrasing.
//!
//! Fields absent from the user's query stay blank. They must never be
//! filled with defaults: a defaulted field would match unrelated records
//! and poison the similarity search with false positives.

use serde::{Deserialize, Serialize};

use super::region::StateCode;
use crate::agent::provider::LlmProvider;
use crate::agent::traits::Agent;
use crate::config::AssistantConfig;
use crate::domain::Domain;
use crate::error::Error;

/// Price tier of a lodging request, as the catalog classifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    /// Budget properties.
    #[serde(rename = "low cost")]
    LowCost,
    /// Mid-tier properties.
    #[serde(rename = "comfort")]
    Comfort,
    /// High-end properties.
    #[serde(rename = "luxury")]
    Luxury,
}

impl PriceRange {
    /// The catalog string for this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LowCost => "low cost",
            Self::Comfort => "comfort",
            Self::Luxury => "luxury",
        }
    }
}

/// Section-style narrative used for experiences and transportation.
///
/// Field names mirror the JSON keys the extraction model is instructed
/// to emit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionNarrative {
    /// Brief summary of the requested service.
    #[serde(rename = "General_Description")]
    pub general_description: Option<String>,
    /// Service type, description, destination details.
    #[serde(rename = "Service_Details")]
    pub service_details: Option<String>,
    /// Supplier or group information.
    #[serde(rename = "Supplier_Information")]
    pub supplier_information: Option<String>,
    /// Pricing-related constraints.
    #[serde(rename = "Tariff_Information")]
    pub tariff_information: Option<String>,
    /// Address and city.
    #[serde(rename = "Location")]
    pub location: Option<String>,
    /// Amenities or features.
    #[serde(rename = "Facilities")]
    pub facilities: Option<String>,
    /// Requested dates or response-time constraints.
    #[serde(rename = "Availability")]
    pub availability: Option<String>,
    /// Adult/child/infant age constraints.
    #[serde(rename = "Age_Restrictions")]
    pub age_restrictions: Option<String>,
    /// Any other operational notes.
    #[serde(rename = "Operational_Info")]
    pub operational_info: Option<String>,
    /// Closed-set region code, when the query names a location.
    #[serde(rename = "State_Code")]
    pub state_code: Option<StateCode>,
}

/// Filterable narrative used for lodging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LodgingNarrative {
    /// Name of the lodging, when the user asked for one by name.
    #[serde(rename = "Name")]
    pub name: Option<String>,
    /// Address and city.
    #[serde(rename = "Location")]
    pub location: Option<String>,
    /// Brief description of the lodging.
    #[serde(rename = "Description")]
    pub description: Option<String>,
    /// The type of lodging.
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    /// Services the lodging should offer.
    #[serde(rename = "Services")]
    pub services: Option<String>,
    /// Tags associated with the lodging.
    #[serde(rename = "Tags")]
    pub tags: Option<String>,
    /// Requested price tier.
    #[serde(rename = "Price_Range")]
    pub price_range: Option<PriceRange>,
    /// Closed-set region code, when the query names a location.
    #[serde(rename = "State_Code")]
    pub state_code: Option<StateCode>,
}

/// A parsed narrative, in the variant matching its domain.
#[derive(Debug, Clone)]
pub enum Narrative {
    /// Experiences / transportation variant.
    Sections(SectionNarrative),
    /// Lodging variant.
    Lodging(LodgingNarrative),
}

/// Filters the narrative made available for the fallback chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailableFilters {
    /// Destination-name value derived from the region code.
    pub state_name: Option<String>,
    /// Requested price tier.
    pub price_range: Option<PriceRange>,
    /// Supplier name, for by-name lookups.
    pub supplier_name: Option<String>,
}

fn clean(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).map(str::trim).filter(|s| !s.is_empty())
}

impl Narrative {
    /// Linearizes the non-blank fields into the canonical embedding text.
    ///
    /// Field order is fixed; blank fields are omitted entirely. Filter-only
    /// fields (price tier, region code) are not part of the embedding text.
    #[must_use]
    pub fn embedding_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            Self::Sections(n) => {
                let fields = [
                    ("General Description", &n.general_description),
                    ("Service Details", &n.service_details),
                    ("Supplier Information", &n.supplier_information),
                    ("Tariff Information", &n.tariff_information),
                    ("Location", &n.location),
                    ("Facilities", &n.facilities),
                    ("Availability", &n.availability),
                    ("Age Restrictions", &n.age_restrictions),
                    ("Operational Info", &n.operational_info),
                ];
                for (label, value) in fields {
                    if let Some(value) = clean(value.as_ref()) {
                        lines.push(format!("{label}: {value}"));
                    }
                }
            }
            Self::Lodging(n) => {
                let fields = [
                    ("Name", &n.name),
                    ("Location", &n.location),
                    ("Description", &n.description),
                    ("Type", &n.kind),
                    ("Services", &n.services),
                    ("Tags", &n.tags),
                ];
                for (label, value) in fields {
                    if let Some(value) = clean(value.as_ref()) {
                        lines.push(format!("{label}: {value}"));
                    }
                }
            }
        }
        lines.join("\n")
    }

    /// The filter values this narrative makes available to the chain.
    #[must_use]
    pub fn available_filters(&self) -> AvailableFilters {
        match self {
            Self::Sections(n) => AvailableFilters {
                state_name: n.state_code.map(|c| c.state_name().to_string()),
                price_range: None,
                supplier_name: None,
            },
            Self::Lodging(n) => AvailableFilters {
                state_name: n.state_code.map(|c| c.state_name().to_string()),
                price_range: n.price_range,
                supplier_name: clean(n.name.as_ref()).map(str::to_string),
            },
        }
    }

    /// The extracted region code, if any.
    #[must_use]
    pub const fn state_code(&self) -> Option<StateCode> {
        match self {
            Self::Sections(n) => n.state_code,
            Self::Lodging(n) => n.state_code,
        }
    }
}

/// Closed-set region codes, spelled out for the extraction instructions.
const STATE_CODE_SET: &str = r#""HGO", "ROO", "NAY", "BCS", "GTO", "TAB", "BCN", "YUC", "EMX", "CHI", "JAL", "MXC", "VCZ", "CAM", "PBL", "QRO", "OAX", "MCH", "CHP", "TLX", "SIN", "AGS", "COA", "COL", "DGO", "GRO", "MOR", "NLE", "SLP", "SON", "TMS", "ZAC""#;

/// Extraction instructions for the experiences variant.
fn experiences_instructions() -> String {
    format!(
        r"You are a structured assistant specialized in tourism experiences search. Given a user query, return a JSON object with the following fields exactly:
- General_Description: A brief summary of the experience.
- Service_Details: Include service description, service type, destination name.
- Supplier_Information: Any supplier or group information.
- Tariff_Information: Pricing constraints if applicable.
- Location: Use location address and city.
- Facilities: Any amenities or features.
- Availability: Requested dates or response-time needs.
- Age_Restrictions: Min/max adult, child, and infant ages.
- Operational_Info: Any other operational notes.
- State_Code: The Mexican state code of the requested location. [{STATE_CODE_SET}]
IMPORTANT: If a piece of information is not present in the user query leave the field blank so we dont match with other experiences."
    )
}

/// Extraction instructions for the transportation variant.
fn transport_instructions() -> String {
    format!(
        r"You are a structured assistant specialized in transport search. Given a user query, return a JSON object with the following fields exactly:
- General_Description: A brief summary of the transport service.
- Service_Details: Include service description, service notes, duration, service type, destination name.
- Availability: Requested dates or response-time needs.
- Age_Restrictions: Min/max adult, child, and infant ages if mentioned.
- Operational_Info: Include max persons, tags, supplier name or supplier group if applicable.
- State_Code: The Mexican state code of the route's destination. [{STATE_CODE_SET}]
IMPORTANT: If a piece of information is not present in the user query leave the field blank so we dont match with other transport services."
    )
}

/// Extraction instructions for the lodging variant.
fn lodging_instructions() -> String {
    format!(
        r"You are a structured assistant specialized in lodging search. Given a user query, return a JSON object with the following fields exactly:
- Name: The name of the lodging.
- Location: Use location address and city if the user query mentions it.
- Description: A brief description of the lodging.
- Type: The type of lodging.
- Services: The services offered by the lodging.
- Tags: The tags associated with the lodging.
- Price_Range: The price range of the lodging. [low cost, comfort, luxury]
- State_Code: The state code of the lodging. [{STATE_CODE_SET}]
IMPORTANT: If a piece of information is not present in the user query leave the field blank so we dont match with other lodging."
    )
}

/// Returns the extraction system prompt for a domain.
#[must_use]
pub fn extraction_instructions(domain: Domain) -> String {
    match domain {
        Domain::Lodging => lodging_instructions(),
        Domain::Transportation => transport_instructions(),
        // The database domain never reaches the narrative extractor; its
        // tool goes through the structured-data path instead.
        Domain::Experiences | Domain::Database => experiences_instructions(),
    }
}

/// Agent that maps a free-text query into a domain narrative schema.
///
/// Low temperature but not zero: the extractor paraphrases descriptions,
/// it does not copy them.
pub struct NarrativeAgent {
    name: String,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl NarrativeAgent {
    /// Creates the extraction agent for one domain.
    #[must_use]
    pub fn new(domain: Domain, config: &AssistantConfig) -> Self {
        Self {
            name: format!("{domain}_narrative"),
            model: config.specialist_model.clone(),
            max_tokens: config.structured_max_tokens,
            system_prompt: extraction_instructions(domain),
        }
    }
}

#[async_trait::async_trait]
impl Agent for NarrativeAgent {
    fn name(&self) -> &str {
        &self.name
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

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

/// Parses a narrative from a model response for the given domain.
///
/// # Errors
///
/// Returns [`Error::ResponseParse`] if the response is not valid JSON or
/// does not match the domain schema (including region codes outside the
/// closed set).
pub fn parse_narrative(domain: Domain, content: &str) -> Result<Narrative, Error> {
    let json_str = strip_code_fences(content);
    let parsed = match domain {
        Domain::Lodging => {
            serde_json::from_str::<LodgingNarrative>(json_str).map(Narrative::Lodging)
        }
        _ => serde_json::from_str::<SectionNarrative>(json_str).map(Narrative::Sections),
    };
    parsed.map_err(|e| Error::ResponseParse {
        message: format!("failed to parse {domain} narrative: {e}"),
        content: content.to_string(),
    })
}

/// Runs the extraction agent and parses its narrative.
///
/// # Errors
///
/// Returns [`Error`] on API failures or unparsable responses.
pub async fn extract_narrative(
    provider: &dyn LlmProvider,
    agent: &NarrativeAgent,
    domain: Domain,
    query: &str,
) -> Result<Narrative, Error> {
    let response = agent.execute(provider, query).await?;
    parse_narrative(domain, &response.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lodging_narrative_parse() {
        let json = r#"{
            "Name": null,
            "Location": "Playa del Carmen",
            "Description": "hotel con piscina",
            "Type": "hotel",
            "Services": "piscina",
            "Tags": null,
            "Price_Range": "comfort",
            "State_Code": "ROO"
        }"#;
        let narrative = parse_narrative(Domain::Lodging, json).unwrap_or_else(|_| unreachable!());
        let filters = narrative.available_filters();
        assert_eq!(filters.state_name.as_deref(), Some("Quintana Roo"));
        assert_eq!(filters.price_range, Some(PriceRange::Comfort));
        assert_eq!(filters.supplier_name, None);
    }

    #[test]
    fn test_blank_fields_stay_blank() {
        let narrative = parse_narrative(Domain::Lodging, "{}").unwrap_or_else(|_| unreachable!());
        assert_eq!(narrative.available_filters(), AvailableFilters::default());
        assert!(narrative.embedding_text().is_empty());
    }

    #[test]
    fn test_embedding_text_fixed_order() {
        let json = r#"{
            "Location": "Oaxaca",
            "General_Description": "caminata en la sierra",
            "State_Code": "OAX"
        }"#;
        let narrative =
            parse_narrative(Domain::Experiences, json).unwrap_or_else(|_| unreachable!());
        let text = narrative.embedding_text();
        // Description always precedes location, regardless of JSON key order.
        assert_eq!(
            text,
            "General Description: caminata en la sierra\nLocation: Oaxaca"
        );
        // Filter-only fields never appear in the embedding text.
        assert!(!text.contains("OAX"));
    }

    #[test]
    fn test_same_intent_same_canonical_text() {
        let a = parse_narrative(
            Domain::Lodging,
            r#"{"Location": "Tulum", "Type": "hotel"}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let b = parse_narrative(
            Domain::Lodging,
            r#"{"Type": "hotel", "Location": "Tulum"}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(a.embedding_text(), b.embedding_text());
    }

    #[test]
    fn test_code_fences_stripped() {
        let wrapped = "```json\n{\"Name\": \"Casa Azul\"}\n```";
        let narrative =
            parse_narrative(Domain::Lodging, wrapped).unwrap_or_else(|_| unreachable!());
        assert_eq!(
            narrative.available_filters().supplier_name.as_deref(),
            Some("Casa Azul")
        );
    }

    #[test]
    fn test_invalid_state_code_rejected() {
        let result = parse_narrative(Domain::Lodging, r#"{"State_Code": "ABC"}"#);
        assert!(matches!(result, Err(Error::ResponseParse { .. })));
    }

    #[test]
    fn test_whitespace_fields_treated_as_blank() {
        let narrative = parse_narrative(Domain::Lodging, r#"{"Name": "   "}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(narrative.available_filters().supplier_name, None);
    }

    #[test]
    fn test_narrative_agent_properties() {
        let config = AssistantConfig::builder()
            .api_key("test")
            .specialist_model("gpt-4o-mini")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let agent = NarrativeAgent::new(Domain::Lodging, &config);
        assert_eq!(agent.name(), "lodging_narrative");
        assert_eq!(agent.model(), "gpt-4o-mini");
        assert!(agent.json_mode());
        assert!((agent.temperature() - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_instructions_name_the_closed_set() {
        for domain in [Domain::Experiences, Domain::Lodging, Domain::Transportation] {
            let instructions = extraction_instructions(domain);
            assert!(instructions.contains("State_Code"));
            assert!(instructions.contains("\"ROO\""));
            assert!(instructions.contains("leave the field blank"));
        }
    }
}
