//! The packaging rule table: which materials degrade under which pollutants

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{Effectiveness, PackagingOption, Pollutant};
use crate::{OnTymError, Result};

static STANDARD_TABLE: LazyLock<RuleTable> = LazyLock::new(|| RuleTable {
    options: standard_options(),
});

/// Read-only, declaration-ordered set of packaging options
#[derive(Debug, Clone)]
pub struct RuleTable {
    options: Vec<PackagingOption>,
}

impl RuleTable {
    /// Build a table from custom rows. Categories must be unique and every
    /// row must name at least one sensitive pollutant.
    pub fn new(options: Vec<PackagingOption>) -> Result<Self> {
        let mut seen = HashSet::new();
        for option in &options {
            if option.category.trim().is_empty() {
                return Err(OnTymError::validation("packaging category cannot be empty"));
            }
            if !seen.insert(option.category.as_str()) {
                return Err(OnTymError::validation(format!(
                    "duplicate packaging category '{}'",
                    option.category
                )));
            }
            if option.sensitive_pollutants.is_empty() {
                return Err(OnTymError::validation(format!(
                    "packaging category '{}' has no sensitive pollutants",
                    option.category
                )));
            }
        }
        Ok(Self { options })
    }

    /// The built-in table, shared for the lifetime of the process
    #[must_use]
    pub fn standard() -> &'static RuleTable {
        &STANDARD_TABLE
    }

    #[must_use]
    pub fn options(&self) -> &[PackagingOption] {
        &self.options
    }

    #[must_use]
    pub fn get(&self, category: &str) -> Option<&PackagingOption> {
        self.options.iter().find(|o| o.category == category)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

fn standard_options() -> Vec<PackagingOption> {
    use Effectiveness::{High, Low, Medium};
    use Pollutant::{No2, O3, Pm10, Pm25, So2};

    vec![
        PackagingOption::new(
            "Glass Packaging",
            &[O3, So2],
            "Highly resistant to O3 and SO2, best for long-term use",
            High,
        ),
        PackagingOption::new(
            "Aluminum Packaging",
            &[O3, No2],
            "Resistant to O3 and NO2, recyclable",
            High,
        ),
        PackagingOption::new(
            "Mushroom Packaging",
            &[Pm25, No2],
            "Affected by PM2.5 and NO2, best for clean environments",
            Low,
        ),
        PackagingOption::new(
            "Recycled Paper with Bio-Coating",
            &[So2, No2, Pm10],
            "Handles SO2, NO2, and PM10 with plant wax coating",
            Medium,
        ),
        PackagingOption::new(
            "Seaweed-Based Packaging",
            &[O3],
            "Can degrade in O3-heavy environments",
            Low,
        ),
        PackagingOption::new(
            "Biodegradable PLA Films",
            &[O3, No2],
            "Affected by O3 and NO2",
            Medium,
        ),
        PackagingOption::new(
            "Compostable PHA Plastics",
            &[No2, Pm10],
            "Resistant to NO2 and PM10",
            Medium,
        ),
        PackagingOption::new(
            "Cloth Bags with Natural Coatings",
            &[Pm25, So2],
            "Affected by PM2.5 and SO2",
            Low,
        ),
        PackagingOption::new(
            "Sugarcane Bagasse Containers",
            &[So2, No2],
            "Handles SO2 and NO2",
            Medium,
        ),
        PackagingOption::new(
            "Recyclable Corrugated Cardboard",
            &[Pm10, No2],
            "Affected by PM10 and NO2",
            Medium,
        ),
    ]
}
