//! Filter strategies and the progressive fallback chain.
//!
//! The chain is an explicit ordered list of predicate sets, strictly
//! decreasing in specificity, ending in the unfiltered terminal strategy.
//! The pipeline walks it most-specific-first and never revisits a
//! rejected stricter strategy, which makes the monotonicity and
//! short-circuit properties directly testable on the data structure.

use serde::Serialize;

use super::narrative::{AvailableFilters, PriceRange};
use super::store::RetrievalRecord;
use crate::domain::Domain;

/// Minimum result-set size for a strategy to be accepted early.
pub const MIN_ACCEPTABLE_RECORDS: usize = 3;

/// Relevance threshold on the closest record's distance, per domain.
///
/// Lodging narratives are denser and embed tighter, so the bar is
/// stricter there.
#[must_use]
pub const fn relevance_threshold(domain: Domain) -> f32 {
    match domain {
        Domain::Lodging => 0.45,
        Domain::Experiences | Domain::Transportation | Domain::Database => 0.60,
    }
}

/// A set of search predicates applied alongside the similarity search.
///
/// String predicates match case-insensitive substrings (the catalog's
/// `LIKE` semantics); the price predicate matches exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    /// Destination (state) name predicate.
    pub state_name: Option<String>,
    /// Price tier predicate.
    pub price_range: Option<PriceRange>,
    /// Supplier name predicate.
    pub supplier_name: Option<String>,
}

impl FilterSet {
    /// Whether this set has no predicates.
    #[must_use]
    pub const fn is_unfiltered(&self) -> bool {
        self.state_name.is_none() && self.price_range.is_none() && self.supplier_name.is_none()
    }

    /// Number of active predicates.
    #[must_use]
    pub const fn specificity(&self) -> usize {
        self.state_name.is_some() as usize
            + self.price_range.is_some() as usize
            + self.supplier_name.is_some() as usize
    }

    /// Evaluates the predicates against one record's filterable columns.
    #[must_use]
    pub fn accepts(
        &self,
        destination_name: &str,
        price_range: Option<PriceRange>,
        supplier_name: &str,
    ) -> bool {
        if let Some(ref wanted) = self.state_name
            && !destination_name
                .to_lowercase()
                .contains(&wanted.to_lowercase())
        {
            return false;
        }
        if let Some(wanted) = self.price_range
            && price_range != Some(wanted)
        {
            return false;
        }
        if let Some(ref wanted) = self.supplier_name
            && !supplier_name
                .to_lowercase()
                .contains(&wanted.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Which fallback level produced a result set.
///
/// Communicated to the caller so the answer can be phrased as an exact
/// match vs. a nearby alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// State, price, and name predicates all applied.
    AllFilters,
    /// State and price predicates applied.
    StateAndPrice,
    /// State and name predicates applied.
    StateAndName,
    /// State predicate only.
    StateOnly,
    /// Price and name predicates applied.
    PriceAndName,
    /// Price predicate only.
    PriceOnly,
    /// Name predicate only.
    NameOnly,
    /// Unfiltered terminal strategy (broadened search).
    NoFilters,
}

impl MatchKind {
    /// Derives the kind from a predicate set's contents.
    #[must_use]
    pub const fn for_set(set: &FilterSet) -> Self {
        match (
            set.state_name.is_some(),
            set.price_range.is_some(),
            set.supplier_name.is_some(),
        ) {
            (true, true, true) => Self::AllFilters,
            (true, true, false) => Self::StateAndPrice,
            (true, false, true) => Self::StateAndName,
            (true, false, false) => Self::StateOnly,
            (false, true, true) => Self::PriceAndName,
            (false, true, false) => Self::PriceOnly,
            (false, false, true) => Self::NameOnly,
            (false, false, false) => Self::NoFilters,
        }
    }

    /// Whether the producing strategy still carried the region predicate.
    #[must_use]
    pub const fn is_regional(self) -> bool {
        matches!(
            self,
            Self::AllFilters | Self::StateAndPrice | Self::StateAndName | Self::StateOnly
        )
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllFilters => "all_filters",
            Self::StateAndPrice => "state_and_price",
            Self::StateAndName => "state_and_name",
            Self::StateOnly => "state_only",
            Self::PriceAndName => "price_and_name",
            Self::PriceOnly => "price_only",
            Self::NameOnly => "name_only",
            Self::NoFilters => "no_filters",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state of the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStrategy {
    /// Predicates applied at this level.
    pub filters: FilterSet,
    /// Tag reported when this level terminates the chain.
    pub kind: MatchKind,
}

/// Builds the ordered fallback chain for the available filter values.
///
/// Candidate order, most specific first: all available predicates →
/// state+price → state → price → name → unfiltered. Candidates with no
/// active predicate collapse into the terminal state; duplicate sets
/// keep only their first (most preferred) occurrence. The result always
/// ends with the unfiltered terminal strategy and its specificity is
/// monotonically non-increasing.
#[must_use]
pub fn strategy_chain(available: &AvailableFilters) -> Vec<FilterStrategy> {
    let full = FilterSet {
        state_name: available.state_name.clone(),
        price_range: available.price_range,
        supplier_name: available.supplier_name.clone(),
    };
    let candidates = [
        full.clone(),
        FilterSet {
            supplier_name: None,
            ..full.clone()
        },
        FilterSet {
            state_name: available.state_name.clone(),
            ..FilterSet::default()
        },
        FilterSet {
            price_range: available.price_range,
            ..FilterSet::default()
        },
        FilterSet {
            supplier_name: available.supplier_name.clone(),
            ..FilterSet::default()
        },
    ];

    let mut chain: Vec<FilterStrategy> = Vec::with_capacity(candidates.len() + 1);
    for set in candidates {
        if set.is_unfiltered() {
            continue;
        }
        if chain.iter().any(|s| s.filters == set) {
            continue;
        }
        chain.push(FilterStrategy {
            kind: MatchKind::for_set(&set),
            filters: set,
        });
    }
    chain.push(FilterStrategy {
        filters: FilterSet::default(),
        kind: MatchKind::NoFilters,
    });
    chain
}

/// Whether a strategy's result set is good enough to stop the chain.
///
/// Terminal acceptance (the last strategy takes whatever it has) is the
/// pipeline's concern; this is only the early-exit rule.
#[must_use]
pub fn is_acceptable(records: &[RetrievalRecord], threshold: f32) -> bool {
    records.len() >= MIN_ACCEPTABLE_RECORDS
        && records.first().is_some_and(|top| top.distance < threshold)
}
