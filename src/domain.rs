//! Travel domains and the keyword-based domain detector.
//!
//! The detector is a deliberately cheap, deterministic pre-filter placed
//! ahead of the model-based query analyzer: queries that cannot qualify
//! for parallel execution are rejected here without paying a reasoning
//! call.

use serde::{Deserialize, Serialize};

/// A travel sub-query category.
///
/// Each domain maps to one specialist agent and one retrieval tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Tours, activities, and excursions.
    Experiences,
    /// Hotels, cabins, and other accommodation.
    Lodging,
    /// Transfers, routes, and rental vehicles.
    Transportation,
    /// Direct structured lookups (availability, prices, details).
    Database,
}

impl Domain {
    /// All domains in specialist launch order.
    pub const ALL: [Self; 4] = [
        Self::Experiences,
        Self::Lodging,
        Self::Transportation,
        Self::Database,
    ];

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Experiences => "experiences",
            Self::Lodging => "lodging",
            Self::Transportation => "transportation",
            Self::Database => "database",
        }
    }

    /// Parses a domain string (case-insensitive). Unknown values map to `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "experiences" | "experience" => Some(Self::Experiences),
            "lodging" | "accommodation" => Some(Self::Lodging),
            "transportation" | "transport" => Some(Self::Transportation),
            "database" | "data" => Some(Self::Database),
            _ => None,
        }
    }

    /// Short human description, used when presenting the specialist roster.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Experiences => "Experiences and activities",
            Self::Lodging => "Accommodation options",
            Self::Transportation => "Transportation logistics",
            Self::Database => "Specific data lookups",
        }
    }

    /// Keywords whose presence in a query marks this domain.
    ///
    /// Matching is case-insensitive substring containment; the lists are
    /// mostly Spanish because that is what the user base writes.
    const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Experiences => &[
                "actividad",
                "actividades",
                "experiencia",
                "experiencias",
                "tour",
                "tours",
                "visita",
                "visitas",
                "excursión",
                "excursiones",
                "buceo",
                "snorkel",
                "senderismo",
                "rafting",
                "aventura",
                "aventuras",
                "qué hacer",
                "qué ver",
                "ver",
                "visitar",
            ],
            Self::Lodging => &[
                "hotel",
                "hoteles",
                "alojamiento",
                "alojamientos",
                "hospedaje",
                "cabaña",
                "cabañas",
                "resort",
                "resorts",
                "hostal",
                "hostelería",
                "dónde dormir",
                "dónde quedarme",
                "dónde hospedarse",
                "habitación",
                "cuarto",
            ],
            Self::Transportation => &[
                "transporte",
                "transportes",
                "transfer",
                "transfers",
                "ruta",
                "rutas",
                "cómo llegar",
                "cómo ir",
                "vuelo",
                "vuelos",
                "avión",
                "autobús",
                "bus",
                "taxi",
                "uber",
                "carro",
                "auto",
                "coche",
                "llegada",
                "salida",
                "desplazamiento",
            ],
            Self::Database => &[
                "disponibilidad",
                "disponible",
                "cuándo",
                "fechas",
                "precio",
                "precios",
                "costo",
                "costos",
                "información",
                "detalles",
                "especificaciones",
                "buscar",
                "búsqueda",
                "filtro",
            ],
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects which domains a query mentions.
///
/// Pure function, no I/O. Returns domains in [`Domain::ALL`] order,
/// each at most once.
#[must_use]
pub fn detect_domains(query: &str) -> Vec<Domain> {
    let lowered = query.to_lowercase();
    Domain::ALL
        .into_iter()
        .filter(|domain| {
            domain
                .keywords()
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .collect()
}

/// Whether parallel execution should be used for the detected domains.
///
/// True iff the master switch is on and the query spans at least
/// `min_domains` domains. This gate also applies to the model-based
/// analyzer's verdict, so it is the single source of truth for the
/// fast-path short-circuit invariant.
#[must_use]
pub fn should_use_parallel(enabled: bool, min_domains: usize, detected: &[Domain]) -> bool {
    enabled && detected.len() >= min_domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_multi_domain_query() {
        let detected = detect_domains(
            "Quiero un hotel en Cancún, tours de snorkel y transporte desde el aeropuerto",
        );
        assert!(detected.contains(&Domain::Lodging));
        assert!(detected.contains(&Domain::Experiences));
        assert!(detected.contains(&Domain::Transportation));
        // With a threshold of 3, this query qualifies for parallel execution.
        assert!(should_use_parallel(true, 3, &detected));
    }

    #[test]
    fn test_single_domain_query() {
        let detected = detect_domains("¿Qué hoteles hay en Playa del Carmen con piscina?");
        assert_eq!(detected, vec![Domain::Lodging]);
        // Below the default threshold, parallel is off regardless of the flag.
        assert!(!should_use_parallel(true, 4, &detected));
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        let detected = detect_domains("HOTEL y TOUR en Oaxaca");
        assert!(detected.contains(&Domain::Lodging));
        assert!(detected.contains(&Domain::Experiences));
    }

    #[test]
    fn test_no_domains() {
        assert!(detect_domains("hola, ¿cómo estás?").is_empty());
    }

    #[test]
    fn test_master_switch_disables_parallel() {
        let detected = Domain::ALL.to_vec();
        assert!(!should_use_parallel(false, 1, &detected));
    }

    #[test_case("experiences", Some(Domain::Experiences))]
    #[test_case("Lodging", Some(Domain::Lodging))]
    #[test_case("transport", Some(Domain::Transportation))]
    #[test_case("database", Some(Domain::Database))]
    #[test_case("weather", None)]
    fn test_parse(input: &str, expected: Option<Domain>) {
        assert_eq!(Domain::parse(input), expected);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Domain::Lodging).unwrap_or_default();
        assert_eq!(json, "\"lodging\"");
        let parsed: Domain = serde_json::from_str("\"transportation\"").unwrap_or(Domain::Database);
        assert_eq!(parsed, Domain::Transportation);
    }

    #[test]
    fn test_detected_order_is_stable() {
        let detected = detect_domains("precio de transfer y hotel con tour incluido");
        // Declaration order, not mention order.
        assert_eq!(
            detected,
            vec![
                Domain::Experiences,
                Domain::Lodging,
                Domain::Transportation,
                Domain::Database
            ]
        );
    }
}
