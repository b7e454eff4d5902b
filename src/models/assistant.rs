//! Types exchanged with the AI recommendation proxy

use serde::{Deserialize, Serialize};

/// Structured recommendation returned by the generative model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    pub recommended_product: String,
    pub reason: String,
    pub environmental_impact: String,
}

/// Who produced a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Map a caller-supplied role label. `model` is the provider's name for the
    /// assistant; anything else is not a recognised speaker.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "user" => Some(ChatRole::User),
            "assistant" | "model" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// One prior exchange in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_wire_names() {
        let json = r#"{"recommendedProduct":"Glass Packaging","reason":"inert","environmentalImpact":"reusable"}"#;
        let rec: AiRecommendation = serde_json::from_str(json).unwrap();
        assert_eq!(rec.recommended_product, "Glass Packaging");
        assert_eq!(serde_json::to_string(&rec).unwrap(), json);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(ChatRole::from_label("user"), Some(ChatRole::User));
        assert_eq!(ChatRole::from_label("model"), Some(ChatRole::Assistant));
        assert_eq!(ChatRole::from_label("assistant"), Some(ChatRole::Assistant));
        assert_eq!(ChatRole::from_label("bot"), None);
        assert_eq!(ChatRole::from_label("system"), None);
    }
}
