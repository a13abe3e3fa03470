use serde::Deserialize;
use serde::Serialize;

/// System prompt pre-filled into a fresh panel.
pub const DEFAULT_PROMPT: &str = "Fix typos, spelling and grammar, only output the corrected text and nothing else. Use idioms where appropriate, if the input language is English. If German text contains English phrases, correct and keep them in English. Keep profanity.";

/// A single correction: the system prompt plus the text to correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    pub system_prompt: String,
    pub user_content: String,
}

impl CorrectionRequest {
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
        }
    }
}

/// Outcome of a correction. The failure reason is opaque and only ever displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectionResult {
    Success { text: String },
    Failure { reason: String },
}

impl CorrectionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Text shown in the panel's error area for a failed correction.
pub fn error_message(reason: &str) -> String {
    format!("Error: {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_message_prefixes_reason_verbatim() {
        assert_eq!(error_message("rate limited"), "Error: rate limited");
    }

    #[test]
    fn result_is_tagged_by_variant() {
        let json = serde_json::to_value(CorrectionResult::failure("boom")).expect("serialize");
        assert_eq!(json, serde_json::json!({ "type": "failure", "reason": "boom" }));
    }
}
