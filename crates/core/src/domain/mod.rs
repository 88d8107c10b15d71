// Domain Layer - Experiment model, launch context and response envelope

pub mod command;
pub mod context;
pub mod error;
pub mod experiment;
pub mod response;

// Re-exports
pub use command::FormattedCommand;
pub use context::{cancel_channel, CancelSender, ExecContext};
pub use error::DomainError;
pub use experiment::{CorrelationId, ExecutionHints, ExperimentRequest, Mode};
pub use response::Response;
