//! Messages exchanged between the overlay core and the privileged bridge.
//!
//! The core never talks to the network itself. It sends one [`BridgeRequest`] and waits for
//! exactly one [`BridgeResponse`].

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::chat_completion::ApiErrorBody;
use crate::chat_completion::ChatCompletion;
use crate::chat_completion::ChatMessage;
use crate::correction::CorrectionRequest;
use crate::correction::CorrectionResult;
use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed bridge message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported bridge message type `{0}`")]
    UnsupportedType(String),

    #[error("bridge message has no `type` field")]
    MissingType,
}

/// Request sent from the core to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeRequest {
    #[serde(rename = "makeApiCall")]
    MakeApiCall(ApiCall),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCall {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ApiCall {
    /// Builds the two-message conversation (system prompt, then user content).
    pub fn new(settings: &Settings, request: &CorrectionRequest) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            messages: vec![
                ChatMessage::system(request.system_prompt.clone()),
                ChatMessage::user(request.user_content.clone()),
            ],
        }
    }
}

impl BridgeRequest {
    pub fn make_api_call(settings: &Settings, request: &CorrectionRequest) -> Self {
        Self::MakeApiCall(ApiCall::new(settings, request))
    }

    /// Parses a raw message, distinguishing unknown message types from malformed payloads so the
    /// bridge can still answer them.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(bytes)?;
        match value.get("type").and_then(Value::as_str) {
            Some("makeApiCall") => Ok(serde_json::from_value(value)?),
            Some(other) => Err(ProtocolError::UnsupportedType(other.to_string())),
            None => Err(ProtocolError::MissingType),
        }
    }
}

/// Reply from the bridge: `{ success: true, data }` or `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Interprets the reply as a correction outcome.
    ///
    /// `data` follows the chat-completion response shape; an error envelope or a response without
    /// `choices[0].message.content` becomes a failure rather than a panic.
    pub fn into_correction_result(self) -> CorrectionResult {
        if !self.success {
            return CorrectionResult::failure(
                self.error
                    .unwrap_or_else(|| "bridge reported an unknown error".to_string()),
            );
        }

        let Some(data) = self.data else {
            return CorrectionResult::failure("bridge reply carried no data");
        };

        if let Ok(completion) = serde_json::from_value::<ChatCompletion>(data.clone())
            && let Some(content) = completion.first_content()
        {
            return CorrectionResult::success(content);
        }

        match serde_json::from_value::<ApiErrorBody>(data) {
            Ok(body) => CorrectionResult::failure(body.error.message),
            Err(_) => CorrectionResult::failure("response did not contain a completion"),
        }
    }
}
