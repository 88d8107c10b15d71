// Port Layer - Interfaces for external collaborators

pub mod binary_locator;
pub mod id_provider; // For deterministic testing
pub mod process_channel;
pub mod remote_executor;
pub mod response_decoder;

// Re-exports
pub use binary_locator::{BinaryLocator, FixedPathLocator};
pub use id_provider::IdProvider;
pub use process_channel::{ChannelError, LaunchOutcome, ProcessChannel};
pub use remote_executor::RemoteExecutor;
pub use response_decoder::ResponseDecoder;
