// Secure shell delegation
// Runs the local create/destroy logic against a remote host through the system ssh client
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use faultline_core::application::constants::UID_ARG_PREFIX;
use faultline_core::application::{Executor, ExecutorConfig};
use faultline_core::domain::experiment::{
    INSTALL_PATH_FLAG, SSH_HOST_FLAG, SSH_KEY_FLAG, SSH_PORT_FLAG, SSH_USER_FLAG,
};
use faultline_core::domain::{ExecContext, ExperimentRequest, Response};
use faultline_core::port::{
    ChannelError, FixedPathLocator, LaunchOutcome, ProcessChannel, RemoteExecutor,
};
use faultline_core::DispatchError;

pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Remote directory holding the fault-injection binary
pub const DEFAULT_INSTALL_PATH: &str = "/opt/chaosblade/bin";

/// Seconds the ssh client waits for the TCP connection
const SSH_CONNECT_TIMEOUT_SECS: u32 = 10;

/// Remote host coordinates, read from the request flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub key: Option<PathBuf>,
    pub install_path: PathBuf,
}

impl SshTarget {
    /// Parse `ssh-host`, `ssh-user`, `ssh-port`, `ssh-key` and `install-path`
    ///
    /// # Errors
    /// - ChannelError::InvalidArgument if the host is missing or the port is not a number
    pub fn from_flags(flags: &HashMap<String, String>) -> Result<Self, ChannelError> {
        let flag = |name: &str| {
            flags
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let host = flag(SSH_HOST_FLAG)
            .ok_or_else(|| ChannelError::InvalidArgument(format!("{} is required", SSH_HOST_FLAG)))?;
        let port = match flag(SSH_PORT_FLAG) {
            Some(p) => p.parse().map_err(|_| {
                ChannelError::InvalidArgument(format!("{} must be a port number: {}", SSH_PORT_FLAG, p))
            })?,
            None => DEFAULT_SSH_PORT,
        };

        Ok(Self {
            host: host.to_string(),
            user: flag(SSH_USER_FLAG).unwrap_or(DEFAULT_SSH_USER).to_string(),
            port,
            key: flag(SSH_KEY_FLAG).map(PathBuf::from),
            install_path: PathBuf::from(flag(INSTALL_PATH_FLAG).unwrap_or(DEFAULT_INSTALL_PATH)),
        })
    }

    /// Path of `binary_name` on the remote host
    pub fn remote_binary(&self, binary_name: &str) -> PathBuf {
        self.install_path.join(binary_name)
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Process channel that runs every operation through `ssh`
///
/// The remote command line travels as one argv element of the local ssh
/// client and reaches the remote shell unquoted, like the local argument
/// string. Only the lookup pattern is single-quoted.
pub struct SshChannel {
    target: SshTarget,
    transport: Arc<dyn ProcessChannel>,
    ssh_program: PathBuf,
}

impl SshChannel {
    /// `transport` runs the local ssh client (normally a LocalChannel)
    pub fn new(target: SshTarget, transport: Arc<dyn ProcessChannel>) -> Self {
        Self {
            target,
            transport,
            ssh_program: PathBuf::from("ssh"),
        }
    }

    pub fn with_ssh_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.ssh_program = program.into();
        self
    }

    fn ssh_args(&self, remote_command: String) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", SSH_CONNECT_TIMEOUT_SECS),
            "-p".to_string(),
            self.target.port.to_string(),
        ];
        if let Some(key) = &self.target.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push(self.target.destination());
        args.push(remote_command);
        args
    }

    async fn run_remote(&self, ctx: &ExecContext, remote_command: String) -> LaunchOutcome {
        let args = self.ssh_args(remote_command);
        self.transport
            .run_synchronous(ctx, &self.ssh_program, &args)
            .await
    }
}

fn command_line(program: &Path, args: &[String]) -> String {
    std::iter::once(program.display().to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape extended-regex metacharacters
fn regex_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if r".[]{}()*+?^$|\".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Single-quote for a POSIX shell
fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// `pgrep -f` pattern for `name`, optionally keyed by the exact `uid=<key>` token
///
/// The first character sits in a bracket class so the pattern never matches
/// the shell running pgrep itself. Inside the class it needs no escaping.
fn lookup_pattern(name: &str, key: Option<&str>) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    let mut pattern = format!("[{}]{}", first, regex_escape(chars.as_str()));
    if let Some(key) = key {
        pattern.push_str(&format!(".* {}{}( |$)", UID_ARG_PREFIX, regex_escape(key)));
    }
    Some(pattern)
}

fn parse_pids(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

fn outcome_to_result(outcome: LaunchOutcome) -> Result<String, ChannelError> {
    if let Some(e) = outcome.start_error {
        return Err(e);
    }
    if let Some(e) = outcome.wait_error {
        return Err(e);
    }
    Ok(outcome.combined_output)
}

#[async_trait]
impl ProcessChannel for SshChannel {
    async fn run_synchronous(
        &self,
        ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> LaunchOutcome {
        self.run_remote(ctx, command_line(program, args)).await
    }

    async fn run_detached(
        &self,
        ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> Result<(), ChannelError> {
        let remote = format!("nohup {} > /dev/null 2>&1 &", command_line(program, args));
        outcome_to_result(self.run_remote(ctx, remote).await).map(|_| ())
    }

    async fn find_process_ids(
        &self,
        ctx: &ExecContext,
        name: &str,
    ) -> Result<Vec<u32>, ChannelError> {
        let pattern = lookup_pattern(name.trim(), ctx.process_key())
            .ok_or_else(|| ChannelError::InvalidArgument("process name is blank".to_string()))?;

        // pgrep exits 1 when nothing matches
        let remote = format!("pgrep -f {} || true", shell_quote(&pattern));
        let output = outcome_to_result(self.run_remote(ctx, remote).await)
            .map_err(|e| ChannelError::Lookup(e.to_string()))?;
        Ok(parse_pids(&output))
    }
}

/// Remote executor over secure shell
///
/// Builds an `SshChannel` from the request flags and runs the same executor
/// logic against it, including liveness verification on the remote host.
pub struct SshExecutor {
    transport: Arc<dyn ProcessChannel>,
    config: ExecutorConfig,
}

impl SshExecutor {
    pub fn new(transport: Arc<dyn ProcessChannel>) -> Self {
        Self {
            transport,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, ctx: &ExecContext, request: &ExperimentRequest) -> Response {
        let target = match SshTarget::from_flags(&request.flags) {
            Ok(target) => target,
            Err(source) => {
                warn!(uid = %request.correlation_id, error = %source, "Invalid secure shell target");
                return Response::from_error(request.mode, &DispatchError::StartFailure { source });
            }
        };

        info!(
            uid = %request.correlation_id,
            destination = %target.destination(),
            port = %target.port,
            "Delegating experiment over secure shell"
        );

        let locator = FixedPathLocator::new(target.remote_binary(&self.config.process_name));
        let channel = SshChannel::new(target, Arc::clone(&self.transport));
        let executor = Executor::new(Arc::new(channel), Arc::new(locator))
            .with_config(self.config.clone());

        executor.exec(ctx, &request.for_remote()).await
    }
}
