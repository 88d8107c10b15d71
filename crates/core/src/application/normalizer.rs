// Response Normalizer - launch outcome to dispatch result
use serde::Deserialize;
use serde_json::Value;

use crate::error::DispatchError;
use crate::port::{LaunchOutcome, ResponseDecoder};

/// Envelope printed by the fault-injection binary
///
/// `{"code": 200, "success": true, "result": ...}` or
/// `{"code": 56000, "success": false, "error": "..."}`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Option<Value>,
    success: bool,
    #[serde(default, alias = "err")]
    error: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

/// Default decoder for the JSON envelope
///
/// Tries the whole output first, then its last non-empty line, so stray
/// diagnostics printed before the envelope do not break decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEnvelopeDecoder;

impl JsonEnvelopeDecoder {
    fn parse(raw: &str) -> Result<Envelope, serde_json::Error> {
        let trimmed = raw.trim();
        match serde_json::from_str(trimmed) {
            Ok(envelope) => Ok(envelope),
            Err(e) => match trimmed.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(last) if last.trim() != trimmed => serde_json::from_str(last.trim()),
                _ => Err(e),
            },
        }
    }
}

fn code_to_string(code: Value) -> Option<String> {
    match code {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl ResponseDecoder for JsonEnvelopeDecoder {
    fn decode(&self, raw: &str) -> Result<Value, DispatchError> {
        let envelope = Self::parse(raw).map_err(|e| DispatchError::DecodeFailure {
            code: None,
            message: format!("decode response failed, {}: {}", e, raw.trim()),
        })?;

        if !envelope.success {
            return Err(DispatchError::DecodeFailure {
                code: envelope.code.and_then(code_to_string),
                message: envelope
                    .error
                    .unwrap_or_else(|| "experiment reported failure".to_string()),
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

/// Map a synchronous launch outcome to the dispatch result
///
/// Start and wait errors take precedence; only a clean exit reaches the decoder,
/// and the decoded payload decides success.
pub fn normalize(
    outcome: LaunchOutcome,
    decoder: &dyn ResponseDecoder,
) -> Result<Value, DispatchError> {
    if let Some(source) = outcome.start_error {
        return Err(DispatchError::StartFailure { source });
    }
    if let Some(source) = outcome.wait_error {
        return Err(DispatchError::WaitFailure { source });
    }
    decoder.decode(&outcome.combined_output)
}
