// Central Error Type for dispatch

use thiserror::Error;

use crate::port::ChannelError;

/// Error code for launch and verification failures
pub const EXEC_FAILED: &str = "EXEC_FAILED";

/// Error code for undecodable output without an embedded code
pub const DECODE_FAILED: &str = "DECODE_FAILED";

/// Dispatch failure (closed set, every variant is terminal for the invocation)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The process could not be spawned (binary missing, permission denied, ...)
    #[error(transparent)]
    StartFailure { source: ChannelError },

    /// The process started but terminated abnormally or was cancelled
    #[error(transparent)]
    WaitFailure { source: ChannelError },

    /// A background launch left no discoverable process behind
    #[error("can't find {process} running{}", lookup_suffix(.cause))]
    VerificationFailure {
        process: String,
        cause: Option<ChannelError>,
    },

    /// Clean exit, but the payload is undecodable or reports failure
    #[error("{message}")]
    DecodeFailure {
        code: Option<String>,
        message: String,
    },
}

fn lookup_suffix(cause: &Option<ChannelError>) -> String {
    match cause {
        Some(err) => format!(": {}", err),
        None => String::new(),
    }
}

impl DispatchError {
    /// Stable error code surfaced in `Response.code`
    pub fn code(&self) -> String {
        match self {
            DispatchError::StartFailure { .. }
            | DispatchError::WaitFailure { .. }
            | DispatchError::VerificationFailure { .. } => EXEC_FAILED.to_string(),
            DispatchError::DecodeFailure { code, .. } => {
                code.clone().unwrap_or_else(|| DECODE_FAILED.to_string())
            }
        }
    }
}

/// Result type alias using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let start = DispatchError::StartFailure {
            source: ChannelError::SpawnFailed("denied".to_string()),
        };
        assert_eq!(start.code(), EXEC_FAILED);
        assert_eq!(start.to_string(), "spawn failed: denied");

        let decode = DispatchError::DecodeFailure {
            code: None,
            message: "bad".to_string(),
        };
        assert_eq!(decode.code(), DECODE_FAILED);
    }

    #[test]
    fn test_verification_message() {
        let plain = DispatchError::VerificationFailure {
            process: "chaos_os".to_string(),
            cause: None,
        };
        assert_eq!(plain.to_string(), "can't find chaos_os running");

        let detailed = DispatchError::VerificationFailure {
            process: "chaos_os".to_string(),
            cause: Some(ChannelError::Lookup("permission denied".to_string())),
        };
        assert_eq!(
            detailed.to_string(),
            "can't find chaos_os running: process lookup failed: permission denied"
        );
    }
}
