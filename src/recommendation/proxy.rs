//! AI recommendation proxy
//!
//! Stateless: every call carries its own description, reading or chat history.
//! Failures are returned once; nothing is retried or cached here.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::parse::parse_recommendation;
use super::prompt::{assistant_persona, recommendation_prompt};
use super::rules::RuleTable;
use crate::ai::LanguageModel;
use crate::models::{AiRecommendation, AirQualityReading, ChatRole, ChatTurn};
use crate::{OnTymError, Result};

pub const EMPTY_CHAT_REPLY: &str = "No response received.";

/// A history entry as submitted by a client, before role filtering
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledTurn {
    pub role: String,
    pub content: String,
}

/// Keep user/assistant turns in submission order, dropping anything else
#[must_use]
pub fn filter_history(turns: Vec<LabeledTurn>) -> Vec<ChatTurn> {
    turns
        .into_iter()
        .filter_map(|turn| {
            ChatRole::from_label(&turn.role).map(|role| ChatTurn {
                role,
                content: turn.content,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct RecommendationProxy {
    model: Arc<dyn LanguageModel>,
    persona: Arc<str>,
}

impl RecommendationProxy {
    pub fn new(model: Arc<dyn LanguageModel>, table: &RuleTable) -> Self {
        Self {
            model,
            persona: assistant_persona(table).into(),
        }
    }

    /// Ask the model for one structured recommendation.
    ///
    /// Input is validated before any network call: the description must not be
    /// blank and the reading must be present with every core component.
    #[instrument(skip_all, fields(description_len = description.len()))]
    pub async fn recommend(
        &self,
        description: &str,
        reading: Option<&AirQualityReading>,
    ) -> Result<AiRecommendation> {
        if description.trim().is_empty() {
            return Err(OnTymError::validation("Description is required"));
        }
        let reading = reading
            .ok_or_else(|| OnTymError::validation("Air quality data is required"))?;
        reading.ensure_core_components()?;

        let prompt = recommendation_prompt(description, reading);
        let raw = self.model.generate(&prompt).await?;

        match parse_recommendation(&raw) {
            Ok(recommendation) => {
                info!(
                    product = %recommendation.recommended_product,
                    "AI recommendation received"
                );
                Ok(recommendation)
            }
            Err(err) => {
                warn!(raw = %raw, "AI reply was not a recommendation object");
                Err(err)
            }
        }
    }

    /// Conversational exchange with the packaging assistant persona
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<String> {
        if message.trim().is_empty() {
            return Err(OnTymError::validation("Message is required"));
        }

        let reply = self.model.converse(&self.persona, history, message).await?;
        if reply.trim().is_empty() {
            warn!("AI returned an empty chat reply");
            return Ok(EMPTY_CHAT_REPLY.to_string());
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aqi, Pollutant};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a canned string and records what it was sent
    struct ScriptedModel {
        reply: Result<String>,
        calls: AtomicUsize,
        last_history: Mutex<Vec<ChatTurn>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_history: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(OnTymError::upstream("connection reset")),
                calls: AtomicUsize::new(0),
                last_history: Mutex::new(Vec::new()),
            })
        }

        fn respond(&self) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(OnTymError::upstream(e.to_string())),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.respond()
        }

        async fn converse(&self, _system: &str, history: &[ChatTurn], _message: &str) -> Result<String> {
            *self.last_history.lock().unwrap() = history.to_vec();
            self.respond()
        }
    }

    fn proxy(model: Arc<ScriptedModel>) -> RecommendationProxy {
        RecommendationProxy::new(model, RuleTable::standard())
    }

    fn reading() -> AirQualityReading {
        let components = BTreeMap::from([
            (Pollutant::O3, 75.0),
            (Pollutant::No2, 20.0),
            (Pollutant::Pm10, 30.0),
            (Pollutant::Pm25, 10.0),
            (Pollutant::Co, 5.0),
        ]);
        AirQualityReading::new(Aqi::try_from(4u8).unwrap(), components, "Chennai".into())
    }

    const FENCED: &str = "```json\n{\"recommendedProduct\":\"Glass Packaging\",\"reason\":\"Ozone resistant\",\"environmentalImpact\":\"Reusable\"}\n```";

    #[tokio::test]
    async fn test_fenced_reply_is_parsed() {
        let model = ScriptedModel::replying(FENCED);
        let recommendation = proxy(model.clone())
            .recommend("Shipping olive oil", Some(&reading()))
            .await
            .unwrap();
        assert_eq!(recommendation.recommended_product, "Glass Packaging");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_description_fails_before_network() {
        let model = ScriptedModel::replying(FENCED);
        for description in ["", "   ", "\n\t"] {
            let result = proxy(model.clone()).recommend(description, Some(&reading())).await;
            assert!(matches!(result, Err(OnTymError::Validation { .. })));
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_reading_fails_before_network() {
        let model = ScriptedModel::replying(FENCED);
        let result = proxy(model.clone()).recommend("Olive oil", None).await;
        assert!(matches!(result, Err(OnTymError::Validation { .. })));

        let mut partial = reading();
        partial.components.remove(&Pollutant::Co);
        let result = proxy(model.clone()).recommend("Olive oil", Some(&partial)).await;
        assert!(matches!(result, Err(OnTymError::Validation { .. })));

        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prose_reply_is_format_error() {
        let model = ScriptedModel::replying("I think glass would be lovely!");
        let result = proxy(model).recommend("Olive oil", Some(&reading())).await;
        assert!(matches!(result, Err(OnTymError::ResponseFormat { .. })));
    }

    #[tokio::test]
    async fn test_upstream_error_is_propagated_once() {
        let model = ScriptedModel::failing();
        let result = proxy(model.clone()).recommend("Olive oil", Some(&reading())).await;
        assert!(matches!(result, Err(OnTymError::Upstream { .. })));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let model = ScriptedModel::replying("Hi!");
        let result = proxy(model.clone()).chat("  ", &[]).await;
        match result {
            Err(OnTymError::Validation { message }) => assert_eq!(message, "Message is required"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chat_forwards_filtered_history_in_order() {
        let model = ScriptedModel::replying("Try bagasse.");
        let history = filter_history(vec![
            LabeledTurn { role: "user".into(), content: "one".into() },
            LabeledTurn { role: "bot".into(), content: "dropped".into() },
            LabeledTurn { role: "model".into(), content: "two".into() },
            LabeledTurn { role: "system".into(), content: "dropped".into() },
            LabeledTurn { role: "user".into(), content: "three".into() },
        ]);

        let reply = proxy(model.clone()).chat("What about trays?", &history).await.unwrap();
        assert_eq!(reply, "Try bagasse.");

        let sent = model.last_history.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                ChatTurn::user("one"),
                ChatTurn::assistant("two"),
                ChatTurn::user("three"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_chat_reply_gets_placeholder() {
        let model = ScriptedModel::replying("   ");
        let reply = proxy(model).chat("Hello", &[]).await.unwrap();
        assert_eq!(reply, EMPTY_CHAT_REPLY);
    }
}
