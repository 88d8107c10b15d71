// Binary Locator Port (resolves the fault-injection binary)

use crate::port::ChannelError;
use std::path::PathBuf;

/// Binary locator interface
///
/// A resolution failure is reported as a start failure by the executor.
pub trait BinaryLocator: Send + Sync {
    fn locate(&self) -> Result<PathBuf, ChannelError>;
}

/// Locator returning a fixed path without touching the filesystem
///
/// Used for remote hosts, where the path is only meaningful on the other side.
pub struct FixedPathLocator {
    path: PathBuf,
}

impl FixedPathLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BinaryLocator for FixedPathLocator {
    fn locate(&self) -> Result<PathBuf, ChannelError> {
        Ok(self.path.clone())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Locator that always fails, as when the binary is not installed
    pub struct MissingBinaryLocator;

    impl BinaryLocator for MissingBinaryLocator {
        fn locate(&self) -> Result<PathBuf, ChannelError> {
            Err(ChannelError::BinaryNotFound("chaos_os".to_string()))
        }
    }
}
