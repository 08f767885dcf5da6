//! Execution runtimes for Loopwright.
//!
//! The only runtime shipped here is [`SimulatedRuntime`]: commands are
//! answered from a canned table and file edits land in an in-memory
//! [`FileStore`]. Nothing touches the host system.

pub mod commands;
pub mod file_store;
pub mod simulated;

pub use commands::CommandTable;
pub use file_store::FileStore;
pub use simulated::SimulatedRuntime;
