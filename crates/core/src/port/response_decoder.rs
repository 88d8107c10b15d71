// Response Decoder Port
// The envelope format belongs to the fault-injection binary; this port keeps it pluggable

use crate::error::DispatchError;
use serde_json::Value;

/// Decodes the captured output of a clean synchronous run
pub trait ResponseDecoder: Send + Sync {
    /// Return the decoded result payload on success
    ///
    /// # Errors
    /// - DispatchError::DecodeFailure if the text is undecodable or the
    ///   envelope itself reports failure
    fn decode(&self, raw: &str) -> Result<Value, DispatchError>;
}
