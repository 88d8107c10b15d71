// Dispatch constants (No magic values)
use std::time::Duration;

/// Process name of the fault-injection binary
pub const OS_BIN: &str = "chaos_os";

/// Argument prefix carrying the correlation id
pub const UID_ARG_PREFIX: &str = "uid=";

/// Settle time before the first liveness lookup (800ms)
pub const DEFAULT_VERIFY_INITIAL_DELAY: Duration = Duration::from_millis(800);

/// Interval between liveness lookups (100ms)
pub const DEFAULT_VERIFY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Liveness lookups per background launch
/// 800ms + 2 x 100ms keeps the worst case at the historical 1s grace period
pub const DEFAULT_VERIFY_MAX_ATTEMPTS: u32 = 3;
