//! Shared fixtures: a scripted stand-in for the fault-injection binary
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use faultline_core::application::{Executor, ExecutorConfig, LivenessPolicy};
use faultline_infra_system::{BinDirLocator, LocalChannel};

/// Behaviour is chosen by the target (`$2`)
const FAKE_CHAOS_OS: &str = r#"#!/bin/sh
case "$2" in
  ok)
    echo "{\"code\":200,\"success\":true,\"result\":\"$1-$3\"}"
    ;;
  echoargs)
    printf '{"code":200,"success":true,"result":"%s"}\n' "$*"
    ;;
  noisy)
    echo "warming up" 1>&2
    sleep 0.2
    echo '{"code":200,"success":true,"result":"noisy"}'
    ;;
  fail)
    echo '{"code":56000,"success":false,"error":"target not supported"}'
    ;;
  garbage)
    echo "not json at all"
    ;;
  crash)
    echo "partial output"
    exit 3
    ;;
  hang)
    exec sleep 30
    ;;
  linger)
    sleep 3
    ;;
  quick)
    exit 0
    ;;
esac
"#;

static BIN_DIR: OnceLock<PathBuf> = OnceLock::new();
static NEXT_UID: AtomicU32 = AtomicU32::new(0);

/// Directory holding the scripted `chaos_os`, written once per test binary
pub fn bin_dir() -> PathBuf {
    BIN_DIR
        .get_or_init(|| {
            let dir = std::env::temp_dir().join(format!("faultline-it-{}", std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join("chaos_os");
            std::fs::write(&path, FAKE_CHAOS_OS).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            dir
        })
        .clone()
}

/// Correlation id no other running test shares
pub fn unique_uid(tag: &str) -> String {
    format!(
        "{}{}n{}",
        tag,
        std::process::id(),
        NEXT_UID.fetch_add(1, Ordering::SeqCst)
    )
}

pub fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        liveness: LivenessPolicy {
            initial_delay: Duration::from_millis(300),
            poll_interval: Duration::from_millis(100),
            max_attempts: 3,
            distinguish_lookup_errors: false,
        },
        ..Default::default()
    }
}

/// Executor over real local processes and the scripted binary
pub fn local_executor() -> Executor {
    Executor::new(
        Arc::new(LocalChannel::new()),
        Arc::new(BinDirLocator::new(bin_dir())),
    )
    .with_config(fast_config())
}
