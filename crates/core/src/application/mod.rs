// Application Layer - Dispatch use cases

pub mod command_formatter;
pub mod constants;
pub mod executor;
pub mod launch_strategy;
pub mod liveness;
pub mod normalizer;

// Re-exports
pub use command_formatter::{format_command, format_request};
pub use executor::{Executor, ExecutorConfig};
pub use launch_strategy::LaunchStrategy;
pub use liveness::{LivenessPolicy, LivenessVerifier, VerificationResult};
pub use normalizer::{normalize, JsonEnvelopeDecoder};
