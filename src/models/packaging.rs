//! Packaging material knowledge used by the recommendation selector

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::air_quality::Pollutant;

/// How well a material holds up against its sensitive pollutants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effectiveness {
    High,
    Medium,
    Low,
}

impl fmt::Display for Effectiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effectiveness::High => f.write_str("high"),
            Effectiveness::Medium => f.write_str("medium"),
            Effectiveness::Low => f.write_str("low"),
        }
    }
}

/// One row of the packaging rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingOption {
    /// Display name, unique within a rule table
    pub category: String,
    /// Pollutants this material degrades under
    pub sensitive_pollutants: BTreeSet<Pollutant>,
    /// Human-readable tradeoff note
    pub description: String,
    pub effectiveness: Effectiveness,
}

impl PackagingOption {
    #[must_use]
    pub fn new(
        category: &str,
        sensitive_pollutants: &[Pollutant],
        description: &str,
        effectiveness: Effectiveness,
    ) -> Self {
        Self {
            category: category.to_string(),
            sensitive_pollutants: sensitive_pollutants.iter().copied().collect(),
            description: description.to_string(),
            effectiveness,
        }
    }

    /// True when at least one of the given pollutants affects this material
    #[must_use]
    pub fn is_sensitive_to_any(&self, pollutants: &BTreeSet<Pollutant>) -> bool {
        !self.sensitive_pollutants.is_disjoint(pollutants)
    }
}
