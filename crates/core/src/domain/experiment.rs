// Experiment Domain Model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::{DomainError, Result};

/// Flag selecting the command channel (`ssh` for remote delegation)
pub const CHANNEL_FLAG: &str = "channel";

/// Channel value that triggers remote delegation
pub const SSH_CHANNEL: &str = "ssh";

/// Flag asking `disk fill` to keep its file handle open after create
pub const RETAIN_HANDLE_FLAG: &str = "retain-handle";

pub const DISK_TARGET: &str = "disk";
pub const FILL_ACTION: &str = "fill";

/// Secure shell flags
pub const SSH_HOST_FLAG: &str = "ssh-host";
pub const SSH_USER_FLAG: &str = "ssh-user";
pub const SSH_PORT_FLAG: &str = "ssh-port";
pub const SSH_KEY_FLAG: &str = "ssh-key";
pub const INSTALL_PATH_FLAG: &str = "install-path";

/// Flags consumed by delegation, never forwarded to the remote binary
pub const REMOTE_ONLY_FLAGS: &[&str] = &[
    CHANNEL_FLAG,
    SSH_HOST_FLAG,
    SSH_USER_FLAG,
    SSH_PORT_FLAG,
    SSH_KEY_FLAG,
    INSTALL_PATH_FLAG,
];

/// Correlation ID (unique per invocation, passed to the binary as `uid=`)
pub type CorrelationId = String;

/// Experiment lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Inject the fault
    Create,
    /// Revert the fault
    Destroy,
}

impl Mode {
    /// Keyword passed as the first positional argument of the binary
    pub fn keyword(&self) -> &'static str {
        match self {
            Mode::Create => "create",
            Mode::Destroy => "destroy",
        }
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, Mode::Destroy)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How the caller expects the experiment to be launched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHints {
    /// Delegate the whole request to a secure shell host
    pub remote_channel: bool,
    /// Launch in the background, decoupled from the caller
    pub detached: bool,
    /// The binary keeps running after a successful create
    pub process_hang_expected: bool,
}

impl ExecutionHints {
    /// Derive hints from the action flags
    ///
    /// - `channel=ssh` selects remote delegation
    /// - `disk fill` with `retain-handle=true` must outlive the caller
    pub fn from_flags(target: &str, action: &str, flags: &HashMap<String, String>) -> Self {
        let flag = |name: &str| flags.get(name).map(String::as_str);

        Self {
            remote_channel: flag(CHANNEL_FLAG) == Some(SSH_CHANNEL),
            detached: target == DISK_TARGET
                && action == FILL_ACTION
                && flag(RETAIN_HANDLE_FLAG) == Some("true"),
            process_hang_expected: false,
        }
    }

    /// Union of two hint sets (a hint set by either side stays set)
    pub fn merge(self, other: ExecutionHints) -> Self {
        Self {
            remote_channel: self.remote_channel || other.remote_channel,
            detached: self.detached || other.detached,
            process_hang_expected: self.process_hang_expected || other.process_hang_expected,
        }
    }
}

/// Experiment request (one fault-injection attempt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRequest {
    pub correlation_id: CorrelationId,
    pub target: String,
    pub action_name: String,
    /// Action flags; iteration order is not stable
    #[serde(default)]
    pub flags: HashMap<String, String>,
    pub mode: Mode,
    #[serde(default)]
    pub hints: ExecutionHints,
}

impl ExperimentRequest {
    /// Create a request with no flags and default hints
    pub fn new(
        correlation_id: impl Into<String>,
        target: impl Into<String>,
        action_name: impl Into<String>,
        mode: Mode,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            target: target.into(),
            action_name: action_name.into(),
            flags: HashMap::new(),
            mode,
            hints: ExecutionHints::default(),
        }
    }

    pub fn with_flag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(key.into(), value.into());
        self
    }

    pub fn with_hints(mut self, hints: ExecutionHints) -> Self {
        self.hints = hints;
        self
    }

    /// Merge in the hints implied by the current flags
    pub fn with_derived_hints(mut self) -> Self {
        self.hints = self.effective_hints();
        self
    }

    /// Explicit hints merged with those implied by the current flags
    pub fn effective_hints(&self) -> ExecutionHints {
        self.hints
            .merge(ExecutionHints::from_flags(&self.target, &self.action_name, &self.flags))
    }

    /// Copy of this request as a remote host should run it
    ///
    /// Strips the flags that only steer delegation and clears the remote hint,
    /// so the remote side runs the local create/destroy logic.
    pub fn for_remote(&self) -> Self {
        let mut forwarded = self.clone();
        forwarded
            .flags
            .retain(|k, _| !REMOTE_ONLY_FLAGS.contains(&k.as_str()));
        forwarded.hints.remote_channel = false;
        forwarded
    }

    /// Look up a flag value, treating empty values as absent
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Reject requests the binary cannot interpret
    pub fn validate(&self) -> Result<()> {
        if self.correlation_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "correlation id cannot be empty".to_string(),
            ));
        }
        if self.target.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "target cannot be empty".to_string(),
            ));
        }
        if self.action_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "action name cannot be empty".to_string(),
            ));
        }
        if self.flags.keys().any(|k| k.is_empty()) {
            return Err(DomainError::InvalidFlag(String::new()));
        }
        Ok(())
    }
}
