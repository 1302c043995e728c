//! SSH transport for OpenVMS hosts.
//!
//! The [`RemoteSession`] trait is all the DCL helpers depend on.
//! [`SshSession`] implements it over `ssh2` with password-only
//! authentication; [`DryRunSession`] implements it without a network.

pub mod dry_run;
pub mod retry;
pub mod session;
pub mod ssh;

pub use dry_run::DryRunSession;
pub use retry::{diagnose_ssh_error, retry_with_backoff, RetryConfig};
pub use session::{
    AuthMethod, ExecOptions, LocalTarget, RawOutput, RemoteSession, TransferOptions,
    TransferResult, TransferSource,
};
pub use ssh::SshSession;
