// Local process channel
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use faultline_core::domain::ExecContext;
use faultline_core::port::{ChannelError, LaunchOutcome, ProcessChannel};

use crate::process_table::ProcessTable;

/// Time a cancelled child gets to exit after SIGTERM before SIGKILL (2s)
pub const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(2);

const READ_CHUNK_SIZE: usize = 4096;

/// Process channel running commands on this host
///
/// # Example
/// ```ignore
/// let channel = LocalChannel::new();
/// let outcome = channel
///     .run_synchronous(&ExecContext::background(), Path::new("echo"), &["hi".to_string()])
///     .await;
/// ```
#[derive(Clone, Default)]
pub struct LocalChannel {
    table: ProcessTable,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self {
            table: ProcessTable::new(),
        }
    }

    /// Spawn with piped output, killed if the handle is dropped
    fn spawn_captured(program: &Path, args: &[String]) -> Result<Child, ChannelError> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ChannelError::SpawnFailed(e.to_string()))
    }

    /// Spawn in a new session with output discarded
    ///
    /// The child leads its own session, so neither terminal hangups nor the
    /// caller's exit reach it. The handle is dropped without killing it.
    fn spawn_detached(program: &Path, args: &[String]) -> Result<u32, ChannelError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false);

        #[cfg(unix)]
        {
            // SAFETY: setsid is async-signal-safe and touches no parent state
            unsafe {
                command.pre_exec(|| {
                    nix::unistd::setsid()
                        .map(|_| ())
                        .map_err(io::Error::from)
                });
            }
        }

        let child = command
            .spawn()
            .map_err(|e| ChannelError::SpawnFailed(e.to_string()))?;
        Ok(child.id().unwrap_or_default())
    }

    /// Terminate a cancelled child: SIGTERM first, then SIGKILL after the grace period
    async fn terminate(child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                info!(pid = %pid, "Sending SIGTERM to cancelled process");
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(CANCEL_GRACE_PERIOD, child.wait())
                        .await
                        .is_ok()
                {
                    return;
                }
                warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
            }
        }

        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill cancelled process");
        }
    }
}

/// Read one chunk from an optional stream (`Ok(0)` once it is gone)
async fn read_some<R: AsyncRead + Unpin>(
    reader: &mut Option<R>,
    chunk: &mut [u8],
) -> io::Result<usize> {
    match reader {
        Some(r) => r.read(chunk).await,
        None => Ok(0),
    }
}

/// Drain stdout and stderr into one buffer in arrival order
async fn collect_combined(mut stdout: Option<ChildStdout>, mut stderr: Option<ChildStderr>) -> String {
    let mut combined = Vec::new();
    let mut out_chunk = [0u8; READ_CHUNK_SIZE];
    let mut err_chunk = [0u8; READ_CHUNK_SIZE];
    let mut out_open = stdout.is_some();
    let mut err_open = stderr.is_some();

    loop {
        tokio::select! {
            read = read_some(&mut stdout, &mut out_chunk), if out_open => match read {
                Ok(0) | Err(_) => out_open = false,
                Ok(n) => combined.extend_from_slice(&out_chunk[..n]),
            },
            read = read_some(&mut stderr, &mut err_chunk), if err_open => match read {
                Ok(0) | Err(_) => err_open = false,
                Ok(n) => combined.extend_from_slice(&err_chunk[..n]),
            },
            else => break,
        }
    }

    String::from_utf8_lossy(&combined).into_owned()
}

#[async_trait]
impl ProcessChannel for LocalChannel {
    async fn run_synchronous(
        &self,
        ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> LaunchOutcome {
        info!(
            program = %program.display(),
            args = ?args,
            "Starting synchronous execution"
        );

        let mut child = match Self::spawn_captured(program, args) {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program.display(), error = %e, "Spawn failed");
                return LaunchOutcome::start_failed(e);
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let run = async {
            let output = collect_combined(stdout, stderr).await;
            let status = child.wait().await;
            (output, status)
        };

        let finished = tokio::select! {
            result = run => Some(result),
            _ = ctx.cancelled() => None,
        };

        let outcome = match finished {
            Some((output, Ok(status))) if status.success() => LaunchOutcome::completed(output),
            Some((output, Ok(status))) => {
                LaunchOutcome::wait_failed(output, ChannelError::AbnormalExit(status.to_string()))
            }
            Some((output, Err(e))) => LaunchOutcome::wait_failed(output, ChannelError::Io(e.to_string())),
            None => {
                Self::terminate(&mut child).await;
                LaunchOutcome::wait_failed(String::new(), ChannelError::Cancelled)
            }
        };

        info!(
            program = %program.display(),
            clean_exit = %outcome.is_clean_exit(),
            wait_error = ?outcome.wait_error,
            "Synchronous execution completed"
        );

        outcome
    }

    async fn run_detached(
        &self,
        _ctx: &ExecContext,
        program: &Path,
        args: &[String],
    ) -> Result<(), ChannelError> {
        let pid = Self::spawn_detached(program, args).map_err(|e| {
            warn!(program = %program.display(), error = %e, "Detached spawn failed");
            e
        })?;

        info!(
            program = %program.display(),
            args = ?args,
            pid = %pid,
            "Detached process started"
        );
        Ok(())
    }

    async fn find_process_ids(
        &self,
        ctx: &ExecContext,
        name: &str,
    ) -> Result<Vec<u32>, ChannelError> {
        let table = self.table.clone();
        let name = name.to_string();
        let key = ctx.process_key().map(str::to_string);

        debug!(name = %name, key = ?key, "Looking up processes");
        tokio::task::spawn_blocking(move || table.find(&name, key.as_deref()))
            .await
            .map_err(|e| ChannelError::Lookup(e.to_string()))?
    }
}
