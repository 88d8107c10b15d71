// Response Envelope - the only entity returned to callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Mode;
use crate::error::DispatchError;

/// Uniform success/failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            code: None,
            error: None,
            result: Some(result),
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code.into()),
            error: Some(message.into()),
            result: None,
        }
    }

    /// Build a failed response for a dispatch error
    ///
    /// Launch and verification failures are prefixed with the lifecycle phase
    /// (`create experiment failed, ...`); decode failures carry the payload's
    /// own message.
    pub fn from_error(mode: Mode, err: &DispatchError) -> Self {
        let message = match err {
            DispatchError::DecodeFailure { message, .. } => message.clone(),
            _ => format!("{} experiment failed, {}", mode, err),
        };
        Self::failure(err.code(), message)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
