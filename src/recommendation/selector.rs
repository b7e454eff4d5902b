//! Ranks packaging options against an air-quality reading.
//!
//! The selector flags every pollutant whose concentration is strictly above its
//! configured threshold, keeps the options sensitive to at least one flagged
//! pollutant, and orders them by effectiveness score. Equal scores keep the
//! rule table's declaration order.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde::Serialize;

use super::rules::RuleTable;
use crate::config::{EffectivenessScores, PollutantThresholds, RecommendationConfig};
use crate::models::{AirQualityReading, Effectiveness, PackagingOption, Pollutant};

/// Selector output: the flagged pollutants and the ranked options
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub flagged_pollutants: BTreeSet<Pollutant>,
    pub options: Vec<PackagingOption>,
}

impl Evaluation {
    /// Nothing above threshold; render as "no recommendation", not as an error
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationSelector {
    table: RuleTable,
    thresholds: PollutantThresholds,
    scores: EffectivenessScores,
}

impl Default for RecommendationSelector {
    fn default() -> Self {
        Self::new(RuleTable::standard().clone(), &RecommendationConfig::default())
    }
}

impl RecommendationSelector {
    #[must_use]
    pub fn new(table: RuleTable, config: &RecommendationConfig) -> Self {
        Self {
            table,
            thresholds: config.thresholds.clone(),
            scores: config.effectiveness.clone(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Pollutants strictly above their threshold. Missing or non-finite
    /// concentrations and unconfigured thresholds never flag.
    #[must_use]
    pub fn flag_pollutants(&self, reading: &AirQualityReading) -> BTreeSet<Pollutant> {
        reading
            .components
            .iter()
            .filter(|(pollutant, value)| {
                self.thresholds
                    .limit(**pollutant)
                    .is_some_and(|limit| value.is_finite() && **value > limit)
            })
            .map(|(pollutant, _)| *pollutant)
            .collect()
    }

    fn score(&self, effectiveness: Effectiveness) -> u8 {
        match effectiveness {
            Effectiveness::High => self.scores.high,
            Effectiveness::Medium => self.scores.medium,
            Effectiveness::Low => self.scores.low,
        }
    }

    /// Ranked options for a reading
    #[must_use]
    pub fn select(&self, reading: &AirQualityReading) -> Vec<PackagingOption> {
        self.evaluate(reading).options
    }

    #[tracing::instrument(level = "debug", skip_all, fields(location = %reading.location))]
    pub fn evaluate(&self, reading: &AirQualityReading) -> Evaluation {
        let flagged = self.flag_pollutants(reading);
        if flagged.is_empty() {
            tracing::debug!("No pollutant above threshold");
            return Evaluation {
                flagged_pollutants: flagged,
                options: Vec::new(),
            };
        }

        let mut options: Vec<PackagingOption> = self
            .table
            .options()
            .iter()
            .filter(|option| option.is_sensitive_to_any(&flagged))
            .cloned()
            .collect();

        // sort_by_key is stable
        options.sort_by_key(|option| Reverse(self.score(option.effectiveness)));

        tracing::debug!(
            flagged = ?flagged,
            matches = options.len(),
            "Selected packaging options"
        );

        Evaluation {
            flagged_pollutants: flagged,
            options,
        }
    }
}
