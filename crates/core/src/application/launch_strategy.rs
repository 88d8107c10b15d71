// Launch Strategy - explicit execution-mode decision

use crate::domain::ExperimentRequest;

/// How an experiment request is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Forward the whole request to the remote executor
    RemoteDelegate,
    /// Detached launch followed by liveness verification
    BackgroundLaunch,
    /// Run to completion and decode the output
    SynchronousLaunch,
}

impl LaunchStrategy {
    /// Decide the strategy for a request (first match wins)
    ///
    /// 1. remote channel hint
    /// 2. detached hint, or an expected process hang on create
    /// 3. synchronous otherwise
    ///
    /// Hints implied by the flags are re-derived here, so a request built
    /// before its flags were complete still dispatches by its flags.
    pub fn select(request: &ExperimentRequest) -> Self {
        let hints = request.effective_hints();

        if hints.remote_channel {
            return LaunchStrategy::RemoteDelegate;
        }
        if hints.detached || (hints.process_hang_expected && !request.mode.is_destroy()) {
            return LaunchStrategy::BackgroundLaunch;
        }
        LaunchStrategy::SynchronousLaunch
    }
}

impl std::fmt::Display for LaunchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchStrategy::RemoteDelegate => write!(f, "REMOTE_DELEGATE"),
            LaunchStrategy::BackgroundLaunch => write!(f, "BACKGROUND_LAUNCH"),
            LaunchStrategy::SynchronousLaunch => write!(f, "SYNCHRONOUS_LAUNCH"),
        }
    }
}
