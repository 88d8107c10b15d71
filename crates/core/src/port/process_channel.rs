// Process Channel Port
// Abstraction for launching processes locally or over a secure shell session

use crate::domain::ExecContext;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Outcome of a run-to-completion launch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// The process ran to completion (cleanly or not)
    pub exited_synchronously: bool,
    /// stdout and stderr interleaved in arrival order
    pub combined_output: String,
    pub start_error: Option<ChannelError>,
    pub wait_error: Option<ChannelError>,
}

impl LaunchOutcome {
    /// Clean exit
    pub fn completed(combined_output: impl Into<String>) -> Self {
        Self {
            exited_synchronously: true,
            combined_output: combined_output.into(),
            start_error: None,
            wait_error: None,
        }
    }

    /// Process never started
    pub fn start_failed(err: ChannelError) -> Self {
        Self {
            exited_synchronously: false,
            combined_output: String::new(),
            start_error: Some(err),
            wait_error: None,
        }
    }

    /// Process started but terminated abnormally
    pub fn wait_failed(combined_output: impl Into<String>, err: ChannelError) -> Self {
        Self {
            exited_synchronously: true,
            combined_output: combined_output.into(),
            start_error: None,
            wait_error: Some(err),
        }
    }

    pub fn is_clean_exit(&self) -> bool {
        self.start_error.is_none() && self.wait_error.is_none()
    }
}

/// Channel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("binary not found: {0}")]
    BinaryNotFound(String),

    /// Non-zero exit or death by signal (`exit status: 3`, `signal: 9 (SIGKILL)`)
    #[error("{0}")]
    AbnormalExit(String),

    #[error("cancelled by caller")]
    Cancelled,

    #[error("io error: {0}")]
    Io(String),

    #[error("process lookup failed: {0}")]
    Lookup(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not configured")]
    NotConfigured(String),
}

/// Process Channel trait
///
/// Implementations:
/// - LocalChannel: forks processes on this host
/// - SshChannel: runs the same operations through a secure shell session
#[async_trait]
pub trait ProcessChannel: Send + Sync {
    /// Run `program args...` to completion, capturing stdout and stderr together
    ///
    /// Cancelling `ctx` kills the child and reports `ChannelError::Cancelled`
    /// as the wait error.
    async fn run_synchronous(
        &self,
        ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> LaunchOutcome;

    /// Start `program args...` in the background, output discarded
    ///
    /// The process must survive the caller, including cancellation of `ctx`.
    async fn run_detached(
        &self,
        ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> Result<(), ChannelError>;

    /// PIDs of processes whose name or command line contains `name`
    ///
    /// When `ctx` carries a process key, the command line must contain it too.
    async fn find_process_ids(&self, ctx: &ExecContext, name: &str)
        -> Result<Vec<u32>, ChannelError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recorded channel call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ChannelCall {
        Synchronous {
            program: PathBuf,
            args: Vec<String>,
        },
        Detached {
            program: PathBuf,
            args: Vec<String>,
        },
        Lookup {
            name: String,
            process_key: Option<String>,
        },
    }

    /// Mock Process Channel for testing
    ///
    /// Lookup results are consumed in order; the last one repeats.
    pub struct MockProcessChannel {
        sync_outcome: Arc<Mutex<LaunchOutcome>>,
        detached_result: Arc<Mutex<Result<(), ChannelError>>>,
        lookups: Arc<Mutex<VecDeque<Result<Vec<u32>, ChannelError>>>>,
        calls: Arc<Mutex<Vec<ChannelCall>>>,
    }

    impl MockProcessChannel {
        pub fn new() -> Self {
            Self {
                sync_outcome: Arc::new(Mutex::new(LaunchOutcome::completed(
                    r#"{"code":200,"success":true,"result":"ok"}"#,
                ))),
                detached_result: Arc::new(Mutex::new(Ok(()))),
                lookups: Arc::new(Mutex::new(VecDeque::from(vec![Ok(vec![4242])]))),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn with_sync_outcome(self, outcome: LaunchOutcome) -> Self {
            *self.sync_outcome.lock().unwrap() = outcome;
            self
        }
        pub fn with_detached_result(self, result: Result<(), ChannelError>) -> Self {
            *self.detached_result.lock().unwrap() = result;
            self
        }
        pub fn with_lookups(self, lookups: Vec<Result<Vec<u32>, ChannelError>>) -> Self {
            *self.lookups.lock().unwrap() = lookups.into();
            self
        }
        pub fn calls(&self) -> Vec<ChannelCall> {
            self.calls.lock().unwrap().clone()
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn lookup_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, ChannelCall::Lookup { .. }))
                .count()
        }
    }

    impl Default for MockProcessChannel {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ProcessChannel for MockProcessChannel {
        async fn run_synchronous(
            &self,
            _ctx: &ExecContext,
            program: &Path,
            args: &[String],
        ) -> LaunchOutcome {
            self.calls.lock().unwrap().push(ChannelCall::Synchronous {
                program: program.to_path_buf(),
                args: args.to_vec(),
            });
            self.sync_outcome.lock().unwrap().clone()
        }
        async fn run_detached(
            &self,
            _ctx: &ExecContext,
            program: &Path,
            args: &[String],
        ) -> Result<(), ChannelError> {
            self.calls.lock().unwrap().push(ChannelCall::Detached {
                program: program.to_path_buf(),
                args: args.to_vec(),
            });
            self.detached_result.lock().unwrap().clone()
        }
        async fn find_process_ids(
            &self,
            ctx: &ExecContext,
            name: &str,
        ) -> Result<Vec<u32>, ChannelError> {
            self.calls.lock().unwrap().push(ChannelCall::Lookup {
                name: name.to_string(),
                process_key: ctx.process_key().map(str::to_string),
            });
            let mut lookups = self.lookups.lock().unwrap();
            if lookups.len() > 1 {
                lookups.pop_front().unwrap_or(Ok(Vec::new()))
            } else {
                lookups.front().cloned().unwrap_or(Ok(Vec::new()))
            }
        }
    }
}
