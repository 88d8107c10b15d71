//! Faultline CLI - Dispatch chaos experiments to the OS fault-injection binary

mod logging;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use faultline_core::application::{Executor, ExecutorConfig, LivenessPolicy};
use faultline_core::domain::{cancel_channel, ExecutionHints, ExperimentRequest, Mode, Response};
use faultline_core::port::id_provider::UuidProvider;
use faultline_core::port::IdProvider;
use faultline_infra_system::{BinDirLocator, LocalChannel, SshExecutor};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "faultline")]
#[command(about = "Dispatch chaos experiments to the OS fault-injection binary", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding chaos_os (default: bin/ next to this executable)
    #[arg(long, global = true, env = "FAULTLINE_BIN_DIR")]
    bin_dir: Option<String>,

    /// Log format: json or pretty
    #[arg(long, global = true, env = "FAULTLINE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Delay before the first liveness lookup, in milliseconds
    #[arg(long, global = true, env = "FAULTLINE_VERIFY_INITIAL_DELAY_MS", default_value_t = 800)]
    verify_initial_delay_ms: u64,

    /// Delay between liveness lookups, in milliseconds
    #[arg(long, global = true, env = "FAULTLINE_VERIFY_INTERVAL_MS", default_value_t = 100)]
    verify_interval_ms: u64,

    /// Number of liveness lookups before giving up
    #[arg(long, global = true, env = "FAULTLINE_VERIFY_ATTEMPTS", default_value_t = 3)]
    verify_attempts: u32,

    /// Report lookup failures instead of treating them as "not running"
    #[arg(long, global = true)]
    strict_lookup: bool,

    /// Print the response as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject a fault
    Create(ExperimentArgs),

    /// Revoke a previously injected fault
    Destroy(ExperimentArgs),
}

#[derive(Args)]
struct ExperimentArgs {
    /// Target category (e.g., cpu, disk, process)
    target: String,

    /// Action within the target (e.g., fullload, fill, kill)
    action: String,

    /// Experiment flag as key=value (repeatable)
    #[arg(short, long = "flag", value_parser = parse_flag)]
    flags: Vec<(String, String)>,

    /// Correlation id (generated when omitted)
    #[arg(short, long)]
    uid: Option<String>,

    /// The binary blocks until killed; launch it in the background
    #[arg(long)]
    process_hang: bool,

    /// Launch detached and verify it is running
    #[arg(long)]
    detached: bool,

    /// Delegate to the remote host named by --flag ssh-host=...
    #[arg(long)]
    remote: bool,
}

/// Parse `key=value`; the value may be empty or contain further `=`
fn parse_flag(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("flag name cannot be empty in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Cli {
    fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            liveness: LivenessPolicy {
                initial_delay: Duration::from_millis(self.verify_initial_delay_ms),
                poll_interval: Duration::from_millis(self.verify_interval_ms),
                max_attempts: self.verify_attempts,
                distinguish_lookup_errors: self.strict_lookup,
            },
            ..Default::default()
        }
    }

    fn locator(&self) -> Result<BinDirLocator> {
        match &self.bin_dir {
            Some(dir) => Ok(BinDirLocator::new(shellexpand::tilde(dir).into_owned())),
            None => BinDirLocator::beside_current_exe()
                .context("Failed to resolve the binary directory"),
        }
    }
}

fn build_request(mode: Mode, args: ExperimentArgs) -> Result<ExperimentRequest> {
    let uid = args.uid.unwrap_or_else(|| UuidProvider.generate_id());
    let explicit = ExecutionHints {
        remote_channel: args.remote,
        detached: args.detached,
        process_hang_expected: args.process_hang,
    };

    let request = args
        .flags
        .into_iter()
        .fold(ExperimentRequest::new(uid, args.target, args.action, mode), |req, (k, v)| {
            req.with_flag(k, v)
        })
        .with_hints(explicit)
        .with_derived_hints();

    request.validate().context("Invalid experiment request")?;
    Ok(request)
}

fn print_response(mode: Mode, request: &ExperimentRequest, response: &Response, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(response)?);
        return Ok(());
    }

    let subject = format!("{} {} {}", mode, request.target, request.action_name);
    if response.success {
        println!("{} {}", "✓".green().bold(), subject.bold());
        println!("  {} {}", "uid:".bold(), request.correlation_id);
        if let Some(result) = &response.result {
            println!("  {} {}", "result:".bold(), result);
        }
    } else {
        println!("{} {}", "✗".red().bold(), subject.bold());
        if let Some(code) = &response.code {
            println!("  {} {}", "code:".bold(), code.yellow());
        }
        if let Some(error) = &response.error {
            println!("  {} {}", "error:".bold(), error);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_format)?;

    info!("Faultline v{} starting...", VERSION);

    let config = cli.executor_config();
    let locator = cli.locator()?;
    let channel = Arc::new(LocalChannel::new());
    let remote = SshExecutor::new(channel.clone()).with_config(config.clone());
    let executor = Executor::new(channel, Arc::new(locator))
        .with_remote(Arc::new(remote))
        .with_config(config);

    let (mode, args) = match cli.command {
        Commands::Create(args) => (Mode::Create, args),
        Commands::Destroy(args) => (Mode::Destroy, args),
    };
    let request = build_request(mode, args)?;

    let (cancel, ctx) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling experiment");
            cancel.cancel();
        }
    });

    let response = executor.exec(&ctx, &request).await;
    print_response(mode, &request, &response, cli.json)?;

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
