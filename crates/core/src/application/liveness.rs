// Liveness Verifier - confirms a background launch left a running process
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::constants::{
    DEFAULT_VERIFY_INITIAL_DELAY, DEFAULT_VERIFY_MAX_ATTEMPTS, DEFAULT_VERIFY_POLL_INTERVAL,
};
use crate::domain::ExecContext;
use crate::error::DispatchError;
use crate::port::{ChannelError, ProcessChannel};

/// Polling schedule for liveness verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessPolicy {
    /// Wait before the first lookup, letting the process initialize
    pub initial_delay: Duration,
    /// Wait between lookups
    pub poll_interval: Duration,
    /// Lookups before giving up (at least one is always made)
    pub max_attempts: u32,
    /// Carry the lookup error as the failure cause instead of a plain "not found"
    pub distinguish_lookup_errors: bool,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_VERIFY_INITIAL_DELAY,
            poll_interval: DEFAULT_VERIFY_POLL_INTERVAL,
            max_attempts: DEFAULT_VERIFY_MAX_ATTEMPTS,
            distinguish_lookup_errors: false,
        }
    }
}

impl LivenessPolicy {
    /// Single lookup without waiting
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            max_attempts: 1,
            distinguish_lookup_errors: false,
        }
    }

    /// Worst-case time spent verifying
    pub fn total_budget(&self) -> Duration {
        self.initial_delay + self.poll_interval * self.max_attempts.max(1).saturating_sub(1)
    }
}

/// Result of a liveness check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    pub found: bool,
    pub matched_pids: Vec<u32>,
    /// Error of the last lookup, if it failed
    pub lookup_error: Option<ChannelError>,
}

impl VerificationResult {
    /// Convert to the dispatch outcome
    ///
    /// An empty match set and a lookup error both fail. The cause is only
    /// attached when `distinguish_lookup_errors` is set.
    pub fn into_result(
        self,
        process: &str,
        distinguish_lookup_errors: bool,
    ) -> Result<Vec<u32>, DispatchError> {
        if self.found {
            return Ok(self.matched_pids);
        }
        let cause = if distinguish_lookup_errors {
            self.lookup_error
        } else {
            None
        };
        Err(DispatchError::VerificationFailure {
            process: process.to_string(),
            cause,
        })
    }
}

/// Liveness verifier
pub struct LivenessVerifier {
    channel: Arc<dyn ProcessChannel>,
    policy: LivenessPolicy,
}

impl LivenessVerifier {
    pub fn new(channel: Arc<dyn ProcessChannel>, policy: LivenessPolicy) -> Self {
        Self { channel, policy }
    }

    pub fn policy(&self) -> &LivenessPolicy {
        &self.policy
    }

    /// Poll the process table for `process_name`
    ///
    /// `ctx` should carry the correlation id as its process key. Returns as soon
    /// as one lookup matches; a failed lookup counts as "nothing found" for that
    /// attempt.
    pub async fn verify(&self, ctx: &ExecContext, process_name: &str) -> VerificationResult {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        tokio::time::sleep(self.policy.initial_delay).await;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.poll_interval).await;
            }

            match self.channel.find_process_ids(ctx, process_name).await {
                Ok(pids) if !pids.is_empty() => {
                    debug!(
                        process = %process_name,
                        attempt = %attempt,
                        pids = ?pids,
                        "Liveness check matched"
                    );
                    return VerificationResult {
                        found: true,
                        matched_pids: pids,
                        lookup_error: None,
                    };
                }
                Ok(_) => {
                    debug!(process = %process_name, attempt = %attempt, "No matching process yet");
                    last_error = None;
                }
                Err(e) => {
                    warn!(
                        process = %process_name,
                        attempt = %attempt,
                        error = %e,
                        "Process lookup failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        VerificationResult {
            found: false,
            matched_pids: Vec::new(),
            lookup_error: last_error,
        }
    }
}
