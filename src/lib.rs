//! Run DCL commands, scripts and cluster-wide SYSMAN jobs on OpenVMS hosts
//! over SSH2.

pub mod config;
pub mod error;
pub mod remote;
pub mod vms;

pub use error::{Error, Result, VmsError};
