//! OpenVMS helpers layered on a [`RemoteSession`](crate::remote::RemoteSession).
//!
//! [`VmsExecutor`] runs DCL commands and derives success from `$SEVERITY`;
//! the other modules build file transfer, script execution, cluster-wide
//! SYSMAN runs and batch queue handling on top of it.

pub mod cluster;
pub mod context;
pub mod devices;
pub mod executor;
pub mod path;
pub mod queue;
pub mod script;
pub mod severity;
pub mod transfer;

pub use cluster::{Cluster, CommandList};
pub use context::{ScopeGuard, SessionContext, Target};
pub use devices::{open_files, OpenFileRecord};
pub use executor::{Confirm, ConsoleConfirm, ExecutionResult, VmsExecutor};
pub use path::RemotePath;
pub use queue::{QueueEntry, QueueJob};
pub use script::ScriptRunner;
pub use severity::Severity;
pub use transfer::FileTransfer;
