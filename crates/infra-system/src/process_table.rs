// Process table lookup
// reason: sysinfo for cross-platform process enumeration
use std::sync::{Arc, Mutex};
use sysinfo::{Process, ProcessRefreshKind, ProcessStatus, System, UpdateKind};
use tracing::debug;

use faultline_core::application::constants::UID_ARG_PREFIX;
use faultline_core::port::ChannelError;

/// Process table backed by sysinfo
///
/// Cloning shares the underlying snapshot. Lookups block, so async callers
/// should run them on the blocking pool.
#[derive(Clone)]
pub struct ProcessTable {
    system: Arc<Mutex<System>>,
}

impl ProcessTable {
    /// Create an empty table (filled on first lookup)
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
        }
    }

    /// PIDs of live processes matching `name`, optionally narrowed by `key`
    ///
    /// A process matches when its name or command line contains `name` and,
    /// with a key, one of its arguments is exactly `uid=<key>`. The current
    /// process and zombies are never returned.
    pub fn find(&self, name: &str, key: Option<&str>) -> Result<Vec<u32>, ChannelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChannelError::InvalidArgument(
                "process name is blank".to_string(),
            ));
        }

        let mut sys = self
            .system
            .lock()
            .map_err(|_| ChannelError::Lookup("process table lock poisoned".to_string()))?;
        // argv is re-read every time, pids get reused
        sys.refresh_processes_specifics(ProcessRefreshKind::new().with_cmd(UpdateKind::Always));

        let own_pid = sysinfo::get_current_pid().ok();
        let mut pids: Vec<u32> = sys
            .processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != own_pid)
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .filter(|(_, process)| matches(process, name, key))
            .map(|(pid, _)| pid.as_u32())
            .collect();
        pids.sort_unstable();

        debug!(
            name = %name,
            key = ?key,
            pids = ?pids,
            "Process table lookup completed"
        );

        Ok(pids)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(process: &Process, name: &str, key: Option<&str>) -> bool {
    let cmd = process.cmd();
    let named = process.name().contains(name) || cmd.iter().any(|arg| arg.contains(name));
    named
        && key.map_or(true, |k| {
            let token = format!("{}{}", UID_ARG_PREFIX, k);
            cmd.iter().any(|arg| *arg == token)
        })
}
