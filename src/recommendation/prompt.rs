//! Prompt text sent to the language model

use std::fmt::Write;

use super::rules::RuleTable;
use crate::models::{AirQualityReading, Pollutant};

/// Recommendation prompt embedding the buyer description and every reported
/// pollutant concentration
#[must_use]
pub fn recommendation_prompt(description: &str, reading: &AirQualityReading) -> String {
    let mut prompt = String::from(
        "Based on the following buyer description and air quality data, recommend the most \
         suitable eco-friendly packaging solution. Consider both the buyer's needs and the \
         environmental conditions.\n\n",
    );

    let _ = writeln!(prompt, "Buyer Description: {}\n", description.trim());
    let _ = writeln!(prompt, "Air Quality Data:");
    let _ = writeln!(prompt, "- AQI: {} ({})", reading.aqi, reading.aqi.describe());

    // Core pollutants first, in the order buyers are used to, then any extras
    for pollutant in Pollutant::CORE {
        if let Some(value) = reading.concentration(pollutant) {
            let _ = writeln!(prompt, "- {}: {}", pollutant.label(), value);
        }
    }
    for (pollutant, value) in &reading.components {
        if !Pollutant::CORE.contains(pollutant) {
            let _ = writeln!(prompt, "- {}: {}", pollutant.label(), value);
        }
    }

    prompt.push_str(
        "\nProvide your recommendation in valid JSON format with these exact fields:\n\
         {\n  \"recommendedProduct\": \"product name\",\n  \"reason\": \"detailed explanation\",\n  \
         \"environmentalImpact\": \"how it helps with current air quality conditions\"\n}\n\n\
         Important: Respond with ONLY the JSON object, no additional text or formatting.",
    );

    prompt
}

/// System instruction for the conversational assistant
#[must_use]
pub fn assistant_persona(table: &RuleTable) -> String {
    let mut persona = String::from(
        "You are a knowledgeable sustainable packaging assistant. You help users choose the \
         right eco-friendly packaging solutions based on their needs and environmental \
         conditions. You have expertise in the following packaging categories:\n\n",
    );

    for option in table.options() {
        let _ = writeln!(persona, "- {}: {}", option.category, option.description);
    }

    persona.push_str(
        "\nWhen making recommendations:\n\
         1. Consider the user's specific needs (e.g., food storage, shipping, etc.)\n\
         2. Take into account environmental conditions\n\
         3. Explain the pros and cons of each recommendation\n\
         4. Suggest alternatives when appropriate\n\
         5. Provide practical usage tips\n\n\
         Keep responses concise, informative, and focused on sustainability.",
    );

    persona
}
