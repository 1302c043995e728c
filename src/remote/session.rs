//! The transport seam between the DCL helpers and an SSH connection.
//!
//! Everything above this trait only knows how to run a command string and
//! move bytes to and from a named remote file. [`SshSession`] is the real
//! implementation; [`DryRunSession`] answers from a queue of canned replies.
//!
//! [`SshSession`]: crate::remote::ssh::SshSession
//! [`DryRunSession`]: crate::remote::dry_run::DryRunSession

use crate::error::Result;
use std::path::PathBuf;

/// How the session authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Password,
    PublicKey,
    Agent,
}

/// Options for a single remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Don't log the raw output
    pub suppress_output: bool,
    /// Never fail on the transport return code
    pub force_success_return_code: bool,
    /// Wrap the command in a POSIX shell invocation
    pub use_shell: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            suppress_output: false,
            force_success_return_code: false,
            use_shell: true,
        }
    }
}

/// What the transport hands back for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit status, when the server reported one and it was asked for
    pub return_code: Option<i32>,
}

/// Options applied to every upload and download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Remote directory the bare file name is resolved against
    pub working_directory: Option<String>,
    /// Expand `*` and `?` in a local source path
    pub use_glob: bool,
    pub use_sudo: bool,
    pub mirror_local_mode: bool,
    pub mode: Option<u32>,
    /// Staging directory for privileged transfers; empty means none
    pub temp_dir: String,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            working_directory: None,
            use_glob: true,
            use_sudo: false,
            mirror_local_mode: false,
            mode: None,
            temp_dir: String::new(),
        }
    }
}

/// Local side of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSource {
    Path(PathBuf),
    Buffer(Vec<u8>),
}

impl TransferSource {
    /// Resolves a relative path against the current directory.
    pub fn absolutize(self) -> Result<Self> {
        match self {
            TransferSource::Path(path) => Ok(TransferSource::Path(std::path::absolute(path)?)),
            buffer => Ok(buffer),
        }
    }
}

impl From<&str> for TransferSource {
    fn from(path: &str) -> Self {
        TransferSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for TransferSource {
    fn from(path: PathBuf) -> Self {
        TransferSource::Path(path)
    }
}

impl From<Vec<u8>> for TransferSource {
    fn from(bytes: Vec<u8>) -> Self {
        TransferSource::Buffer(bytes)
    }
}

/// Local side of a download.
#[derive(Debug)]
pub enum LocalTarget<'a> {
    Path(PathBuf),
    Buffer(&'a mut Vec<u8>),
}

impl LocalTarget<'_> {
    /// Resolves a relative path against the current directory.
    pub fn absolutize(self) -> Result<Self> {
        match self {
            LocalTarget::Path(path) => Ok(LocalTarget::Path(std::path::absolute(path)?)),
            buffer => Ok(buffer),
        }
    }
}

/// Outcome of one upload or download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Remote files written or read, as the server names them
    pub remote_paths: Vec<String>,
    pub bytes_transferred: u64,
}

/// A connected, authenticated session to one remote host.
pub trait RemoteSession {
    /// Host identifier used to tag echoed output.
    fn host(&self) -> &str;

    /// Username the session authenticated as.
    fn user(&self) -> &str;

    fn auth_method(&self) -> AuthMethod;

    /// Runs `command` and captures its output.
    fn execute(&self, command: &str, options: &ExecOptions) -> Result<RawOutput>;

    /// Writes `source` to `remote_name` under `options.working_directory`.
    fn upload(
        &self,
        source: &TransferSource,
        remote_name: &str,
        options: &TransferOptions,
    ) -> Result<TransferResult>;

    /// Reads `remote_name` under `options.working_directory` into `target`.
    fn download(
        &self,
        remote_name: &str,
        target: &mut LocalTarget<'_>,
        options: &TransferOptions,
    ) -> Result<TransferResult>;

    fn exists(&self, remote_path: &str) -> Result<bool>;
}

impl<T: RemoteSession + ?Sized> RemoteSession for Box<T> {
    fn host(&self) -> &str {
        (**self).host()
    }

    fn user(&self) -> &str {
        (**self).user()
    }

    fn auth_method(&self) -> AuthMethod {
        (**self).auth_method()
    }

    fn execute(&self, command: &str, options: &ExecOptions) -> Result<RawOutput> {
        (**self).execute(command, options)
    }

    fn upload(
        &self,
        source: &TransferSource,
        remote_name: &str,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        (**self).upload(source, remote_name, options)
    }

    fn download(
        &self,
        remote_name: &str,
        target: &mut LocalTarget<'_>,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        (**self).download(remote_name, target, options)
    }

    fn exists(&self, remote_path: &str) -> Result<bool> {
        (**self).exists(remote_path)
    }
}

/// Joins a bare remote name onto an optional POSIX-style directory.
pub fn join_remote(directory: Option<&str>, name: &str) -> String {
    match directory {
        Some(dir) if !dir.is_empty() => format!("{}/{}", dir.trim_end_matches('/'), name),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote(None, "A.TXT"), "A.TXT");
        assert_eq!(join_remote(Some(""), "A.TXT"), "A.TXT");
        assert_eq!(join_remote(Some("/DKA0/DIR"), "A.TXT"), "/DKA0/DIR/A.TXT");
        assert_eq!(join_remote(Some("/DKA0/"), "A.TXT"), "/DKA0/A.TXT");
    }

    #[test]
    fn test_absolutize_leaves_buffers_alone() {
        let source = TransferSource::Buffer(b"$ SHOW TIME".to_vec());
        assert_eq!(source.clone().absolutize().unwrap(), source);

        let TransferSource::Path(path) = TransferSource::from("script.com").absolutize().unwrap()
        else {
            panic!("expected a path");
        };
        assert!(path.is_absolute());
        assert!(path.ends_with("script.com"));
    }

    #[test]
    fn test_transfer_options_default() {
        let options = TransferOptions::default();
        assert!(!options.use_sudo);
        assert!(!options.mirror_local_mode);
        assert!(options.mode.is_none());
        assert!(options.temp_dir.is_empty());
    }
}
