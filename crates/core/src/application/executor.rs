// Executor - dispatch entry point for experiment requests
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::command_formatter::format_request;
use crate::application::constants::OS_BIN;
use crate::application::launch_strategy::LaunchStrategy;
use crate::application::liveness::{LivenessPolicy, LivenessVerifier};
use crate::application::normalizer::{normalize, JsonEnvelopeDecoder};
use crate::domain::{ExecContext, ExperimentRequest, Response};
use crate::error::DispatchError;
use crate::port::{BinaryLocator, ChannelError, ProcessChannel, RemoteExecutor, ResponseDecoder};

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Process name looked up after a background launch
    pub process_name: String,
    pub liveness: LivenessPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            process_name: OS_BIN.to_string(),
            liveness: LivenessPolicy::default(),
        }
    }
}

/// Experiment executor
///
/// Chooses a launch strategy per request, launches through the injected
/// channel and normalizes the outcome. Holds no per-call state, so one
/// instance can serve concurrent calls.
pub struct Executor {
    channel: Arc<dyn ProcessChannel>,
    locator: Arc<dyn BinaryLocator>,
    decoder: Arc<dyn ResponseDecoder>,
    remote: Option<Arc<dyn RemoteExecutor>>,
    verifier: LivenessVerifier,
    config: ExecutorConfig,
}

impl Executor {
    /// Create an executor with the JSON envelope decoder and default config
    ///
    /// # Example
    /// ```ignore
    /// let executor = Executor::new(Arc::new(LocalChannel::new()), Arc::new(locator))
    ///     .with_remote(Arc::new(SshExecutor::new(transport)));
    /// let response = executor.exec(&ExecContext::background(), &request).await;
    /// ```
    pub fn new(channel: Arc<dyn ProcessChannel>, locator: Arc<dyn BinaryLocator>) -> Self {
        let config = ExecutorConfig::default();
        Self {
            verifier: LivenessVerifier::new(Arc::clone(&channel), config.liveness.clone()),
            channel,
            locator,
            decoder: Arc::new(JsonEnvelopeDecoder),
            remote: None,
            config,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ResponseDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.verifier = LivenessVerifier::new(Arc::clone(&self.channel), config.liveness.clone());
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn name(&self) -> &'static str {
        "os"
    }

    /// Run one experiment and return the uniform response
    ///
    /// A remote delegate's response is returned unchanged.
    pub async fn exec(&self, ctx: &ExecContext, request: &ExperimentRequest) -> Response {
        let strategy = LaunchStrategy::select(request);
        info!(
            uid = %request.correlation_id,
            target = %request.target,
            action = %request.action_name,
            mode = %request.mode,
            strategy = %strategy,
            "Dispatching experiment"
        );

        if strategy == LaunchStrategy::RemoteDelegate {
            if let Some(remote) = &self.remote {
                return remote.execute(ctx, request).await;
            }
        }

        match self.exec_local(ctx, request, strategy).await {
            Ok(result) => Response::success(result),
            Err(e) => {
                warn!(
                    uid = %request.correlation_id,
                    code = %e.code(),
                    error = %e,
                    "Experiment dispatch failed"
                );
                Response::from_error(request.mode, &e)
            }
        }
    }

    /// Run one experiment, keeping the failure kind
    ///
    /// A failed remote response is reported as `DecodeFailure` carrying the
    /// remote code and message.
    pub async fn exec_checked(
        &self,
        ctx: &ExecContext,
        request: &ExperimentRequest,
    ) -> Result<Value, DispatchError> {
        let strategy = LaunchStrategy::select(request);
        if strategy == LaunchStrategy::RemoteDelegate {
            if let Some(remote) = &self.remote {
                let response = remote.execute(ctx, request).await;
                return if response.success {
                    Ok(response.result.unwrap_or(Value::Null))
                } else {
                    Err(DispatchError::DecodeFailure {
                        code: response.code,
                        message: response.error.unwrap_or_default(),
                    })
                };
            }
        }
        self.exec_local(ctx, request, strategy).await
    }

    async fn exec_local(
        &self,
        ctx: &ExecContext,
        request: &ExperimentRequest,
        strategy: LaunchStrategy,
    ) -> Result<Value, DispatchError> {
        match strategy {
            LaunchStrategy::RemoteDelegate => Err(DispatchError::StartFailure {
                source: ChannelError::NotConfigured("remote channel".to_string()),
            }),
            LaunchStrategy::BackgroundLaunch => self.launch_background(ctx, request).await,
            LaunchStrategy::SynchronousLaunch => self.launch_synchronous(ctx, request).await,
        }
    }

    /// Detached launch, then liveness verification
    ///
    /// Success is asserted by liveness alone; the binary's output is discarded.
    async fn launch_background(
        &self,
        ctx: &ExecContext,
        request: &ExperimentRequest,
    ) -> Result<Value, DispatchError> {
        let program = self
            .locator
            .locate()
            .map_err(|source| DispatchError::StartFailure { source })?;
        let args = format_request(request).args();

        self.channel
            .run_detached(ctx, &program, &args)
            .await
            .map_err(|source| DispatchError::StartFailure { source })?;

        let lookup_ctx = ctx.with_process_key(request.correlation_id.clone());
        let pids = self
            .verifier
            .verify(&lookup_ctx, &self.config.process_name)
            .await
            .into_result(
                &self.config.process_name,
                self.config.liveness.distinguish_lookup_errors,
            )?;

        info!(
            uid = %request.correlation_id,
            pids = ?pids,
            "Background experiment verified running"
        );
        Ok(Value::String(request.correlation_id.clone()))
    }

    /// Run to completion and decode the captured output
    async fn launch_synchronous(
        &self,
        ctx: &ExecContext,
        request: &ExperimentRequest,
    ) -> Result<Value, DispatchError> {
        let program = self
            .locator
            .locate()
            .map_err(|source| DispatchError::StartFailure { source })?;
        let args = format_request(request).args();

        let outcome = self.channel.run_synchronous(ctx, &program, &args).await;
        normalize(outcome, self.decoder.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionHints, Mode};
    use crate::port::binary_locator::mocks::MissingBinaryLocator;
    use crate::port::process_channel::mocks::{ChannelCall, MockProcessChannel};
    use crate::port::remote_executor::mocks::MockRemoteExecutor;
    use crate::port::{FixedPathLocator, LaunchOutcome};
    use serde_json::json;

    const BIN: &str = "/opt/chaos/bin/chaos_os";

    fn executor(channel: Arc<MockProcessChannel>) -> Executor {
        Executor::new(channel, Arc::new(FixedPathLocator::new(BIN))).with_config(ExecutorConfig {
            liveness: LivenessPolicy::immediate(),
            ..Default::default()
        })
    }

    fn cpu_request() -> ExperimentRequest {
        ExperimentRequest::new("uid-100", "cpu", "fullload", Mode::Create)
            .with_flag("cpu-count", "2")
            .with_flag("timeout", "")
    }

    fn background_request(mode: Mode) -> ExperimentRequest {
        ExperimentRequest::new("uid-200", "disk", "fill", mode).with_hints(ExecutionHints {
            detached: true,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_synchronous_happy_path() {
        let channel = Arc::new(MockProcessChannel::new().with_sync_outcome(
            LaunchOutcome::completed(r#"{"code":200,"success":true,"result":"a1b2"}"#),
        ));
        let executor = executor(channel.clone());

        let resp = executor.exec(&ExecContext::background(), &cpu_request()).await;

        assert!(resp.success);
        assert_eq!(resp.result, Some(json!("a1b2")));
        assert_eq!(
            channel.calls(),
            vec![ChannelCall::Synchronous {
                program: BIN.into(),
                args: vec![
                    "create".to_string(),
                    "cpu".to_string(),
                    "fullload".to_string(),
                    "--cpu-count=2".to_string(),
                    "uid=uid-100".to_string(),
                ],
            }]
        );
    }

    #[tokio::test]
    async fn test_start_failure() {
        let channel = Arc::new(MockProcessChannel::new().with_sync_outcome(
            LaunchOutcome::start_failed(ChannelError::SpawnFailed(
                "Permission denied (os error 13)".to_string(),
            )),
        ));
        let executor = executor(channel);

        let resp = executor.exec(&ExecContext::background(), &cpu_request()).await;

        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("EXEC_FAILED"));
        assert!(resp.error.unwrap().contains("Permission denied (os error 13)"));
    }

    #[tokio::test]
    async fn test_wait_failure() {
        let channel = Arc::new(MockProcessChannel::new().with_sync_outcome(
            LaunchOutcome::wait_failed(
                "boom",
                ChannelError::AbnormalExit("exit status: 2".to_string()),
            ),
        ));
        let executor = executor(channel);

        let err = executor
            .exec_checked(&ExecContext::background(), &cpu_request())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::WaitFailure { .. }));
        assert!(err.to_string().contains("exit status: 2"));
    }

    #[tokio::test]
    async fn test_clean_exit_with_failure_payload() {
        let channel = Arc::new(MockProcessChannel::new().with_sync_outcome(
            LaunchOutcome::completed(r#"{"code":48000,"success":false,"error":"bad cpu-count"}"#),
        ));
        let executor = executor(channel);

        let resp = executor.exec(&ExecContext::background(), &cpu_request()).await;

        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("48000"));
        assert_eq!(resp.error.as_deref(), Some("bad cpu-count"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_start_failure() {
        let channel = Arc::new(MockProcessChannel::new());
        let executor = Executor::new(channel.clone(), Arc::new(MissingBinaryLocator));

        let err = executor
            .exec_checked(&ExecContext::background(), &cpu_request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::StartFailure {
                source: ChannelError::BinaryNotFound(_)
            }
        ));
        assert_eq!(channel.call_count(), 0);
    }

    #[tokio::test]
    async fn test_background_verified() {
        let channel = Arc::new(MockProcessChannel::new().with_lookups(vec![Ok(vec![31337])]));
        let executor = executor(channel.clone());

        let resp = executor
            .exec(&ExecContext::background(), &background_request(Mode::Create))
            .await;

        assert!(resp.success);
        assert_eq!(resp.result, Some(json!("uid-200")));

        let calls = channel.calls();
        assert!(matches!(calls[0], ChannelCall::Detached { .. }));
        assert_eq!(
            calls[1],
            ChannelCall::Lookup {
                name: "chaos_os".to_string(),
                process_key: Some("uid-200".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_verification_overrides_launch_success() {
        let channel = Arc::new(
            MockProcessChannel::new()
                .with_detached_result(Ok(()))
                .with_lookups(vec![Ok(vec![])]),
        );
        let executor = executor(channel.clone());

        let resp = executor
            .exec(&ExecContext::background(), &background_request(Mode::Create))
            .await;

        assert!(!resp.success);
        assert_eq!(resp.code.as_deref(), Some("EXEC_FAILED"));
        assert_eq!(
            resp.error.as_deref(),
            Some("create experiment failed, can't find chaos_os running")
        );
    }

    #[tokio::test]
    async fn test_lookup_error_fails_like_not_found() {
        let channel = Arc::new(
            MockProcessChannel::new()
                .with_lookups(vec![Err(ChannelError::Lookup("procfs unavailable".to_string()))]),
        );
        let executor = executor(channel);

        let resp = executor
            .exec(&ExecContext::background(), &background_request(Mode::Create))
            .await;

        assert!(!resp.success);
        assert_eq!(
            resp.error.as_deref(),
            Some("create experiment failed, can't find chaos_os running")
        );
    }

    #[tokio::test]
    async fn test_lookup_error_distinguished_when_configured() {
        let channel = Arc::new(
            MockProcessChannel::new()
                .with_lookups(vec![Err(ChannelError::Lookup("procfs unavailable".to_string()))]),
        );
        let executor = Executor::new(channel, Arc::new(FixedPathLocator::new(BIN))).with_config(
            ExecutorConfig {
                liveness: LivenessPolicy {
                    distinguish_lookup_errors: true,
                    ..LivenessPolicy::immediate()
                },
                ..Default::default()
            },
        );

        let err = executor
            .exec_checked(&ExecContext::background(), &background_request(Mode::Create))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("procfs unavailable"));
    }

    #[tokio::test]
    async fn test_detached_start_failure_skips_verification() {
        let channel = Arc::new(
            MockProcessChannel::new()
                .with_detached_result(Err(ChannelError::SpawnFailed("ENOENT".to_string()))),
        );
        let executor = executor(channel.clone());

        let err = executor
            .exec_checked(&ExecContext::background(), &background_request(Mode::Create))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::StartFailure { .. }));
        assert_eq!(channel.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_process_hang_destroy_runs_synchronously() {
        let channel = Arc::new(MockProcessChannel::new());
        let executor = executor(channel.clone());
        let req = ExperimentRequest::new("uid-300", "process", "stop", Mode::Destroy).with_hints(
            ExecutionHints {
                process_hang_expected: true,
                ..Default::default()
            },
        );

        let resp = executor.exec(&ExecContext::background(), &req).await;

        assert!(resp.success);
        assert!(matches!(channel.calls()[0], ChannelCall::Synchronous { .. }));
    }

    #[tokio::test]
    async fn test_remote_delegation_is_exclusive() {
        let channel = Arc::new(MockProcessChannel::new());
        let remote_response = Response::failure("SSH_FAILED", "connection refused");
        let remote = Arc::new(MockRemoteExecutor::new(remote_response.clone()));
        let executor = executor(channel.clone()).with_remote(remote.clone());

        let req = cpu_request().with_flag("channel", "ssh").with_derived_hints();
        let resp = executor.exec(&ExecContext::background(), &req).await;

        assert_eq!(resp, remote_response);
        assert_eq!(channel.call_count(), 0);
        assert_eq!(remote.requests(), vec![req]);
    }

    #[tokio::test]
    async fn test_ssh_flag_routes_remote_without_derived_hints() {
        let channel = Arc::new(MockProcessChannel::new());
        let remote = Arc::new(MockRemoteExecutor::new(Response::success(json!("remote"))));
        let executor = executor(channel.clone()).with_remote(remote.clone());

        let req = cpu_request().with_flag("channel", "ssh");
        let resp = executor.exec(&ExecContext::background(), &req).await;
        let checked = executor
            .exec_checked(&ExecContext::background(), &req)
            .await;

        assert_eq!(resp.result, Some(json!("remote")));
        assert_eq!(checked, Ok(json!("remote")));
        assert_eq!(channel.call_count(), 0);
        assert_eq!(remote.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_checked() {
        let remote = Arc::new(MockRemoteExecutor::new(Response::failure(
            "EXEC_FAILED",
            "create experiment failed, can't find chaos_os running",
        )));
        let executor = executor(Arc::new(MockProcessChannel::new())).with_remote(remote);
        let req = cpu_request().with_hints(ExecutionHints {
            remote_channel: true,
            ..Default::default()
        });

        let err = executor
            .exec_checked(&ExecContext::background(), &req)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "EXEC_FAILED");
    }

    #[tokio::test]
    async fn test_remote_without_delegate_fails() {
        let channel = Arc::new(MockProcessChannel::new());
        let executor = executor(channel.clone());
        let req = cpu_request().with_hints(ExecutionHints {
            remote_channel: true,
            ..Default::default()
        });

        let resp = executor.exec(&ExecContext::background(), &req).await;

        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("remote channel not configured"));
        assert_eq!(channel.call_count(), 0);
    }
}
