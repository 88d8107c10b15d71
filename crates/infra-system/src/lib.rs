// Faultline Infrastructure - System Adapters
// Implements: ProcessChannel, BinaryLocator, RemoteExecutor

pub mod bin_locator;
pub mod local_channel;
pub mod process_table;
pub mod ssh;

pub use bin_locator::BinDirLocator;
pub use local_channel::LocalChannel;
pub use process_table::ProcessTable;
pub use ssh::{SshChannel, SshExecutor, SshTarget};
