//! A session that never touches the network.
//!
//! Every command is recorded and answered from a queue of canned replies;
//! once the queue is empty the answer is a bare `$SEVERITY` of 1, so a
//! dry run of any workflow completes as if every step succeeded.

use crate::error::{Error, Result};
use crate::remote::session::{
    join_remote, AuthMethod, ExecOptions, LocalTarget, RawOutput, RemoteSession, TransferOptions,
    TransferResult, TransferSource,
};
use log::info;
use std::cell::RefCell;
use std::collections::VecDeque;

enum Reply {
    Output(String),
    ConnectionLost(String),
}

/// An upload seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub remote_name: String,
    pub options: TransferOptions,
    pub source: TransferSource,
}

/// A download seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDownload {
    pub remote_name: String,
    pub options: TransferOptions,
}

/// Records commands and transfers, replies from a queue.
pub struct DryRunSession {
    host: String,
    user: String,
    auth_method: AuthMethod,
    replies: RefCell<VecDeque<Reply>>,
    files: RefCell<VecDeque<Vec<u8>>>,
    commands: RefCell<Vec<String>>,
    options: RefCell<Vec<ExecOptions>>,
    uploads: RefCell<Vec<RecordedUpload>>,
    downloads: RefCell<Vec<RecordedDownload>>,
}

impl DryRunSession {
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            auth_method: AuthMethod::Password,
            replies: RefCell::new(VecDeque::new()),
            files: RefCell::new(VecDeque::new()),
            commands: RefCell::new(Vec::new()),
            options: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
            downloads: RefCell::new(Vec::new()),
        }
    }

    /// Pretends the session authenticated some other way.
    pub fn with_auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    /// Queues raw stdout, exactly as the server would send it.
    pub fn reply_raw(&self, stdout: &str) -> &Self {
        self.replies
            .borrow_mut()
            .push_back(Reply::Output(stdout.to_string()));
        self
    }

    /// Queues `body` followed by a `$SEVERITY` line.
    pub fn reply(&self, body: &str, severity: u8) -> &Self {
        let stdout = if body.is_empty() {
            format!("{}\r\n", severity)
        } else {
            format!("{}\r\n{}\r\n", body.trim_end_matches(['\r', '\n']), severity)
        };
        self.reply_raw(&stdout)
    }

    /// Queues a successful reply carrying `body`.
    pub fn reply_ok(&self, body: &str) -> &Self {
        self.reply(body, 1)
    }

    /// Makes the next command fail at the transport level.
    pub fn drop_connection(&self, message: &str) -> &Self {
        self.replies
            .borrow_mut()
            .push_back(Reply::ConnectionLost(message.to_string()));
        self
    }

    /// Queues the content served by the next download.
    pub fn serve_file(&self, content: &[u8]) -> &Self {
        self.files.borrow_mut().push_back(content.to_vec());
        self
    }

    /// Command strings exactly as sent to the transport.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn exec_options(&self) -> Vec<ExecOptions> {
        self.options.borrow().clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.borrow().clone()
    }

    pub fn downloads(&self) -> Vec<RecordedDownload> {
        self.downloads.borrow().clone()
    }
}

impl RemoteSession for DryRunSession {
    fn host(&self) -> &str {
        &self.host
    }

    fn user(&self) -> &str {
        &self.user
    }

    fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    fn execute(&self, command: &str, options: &ExecOptions) -> Result<RawOutput> {
        info!("[dry-run] {}", command);
        self.commands.borrow_mut().push(command.to_string());
        self.options.borrow_mut().push(options.clone());

        match self.replies.borrow_mut().pop_front() {
            Some(Reply::Output(stdout)) => Ok(RawOutput {
                stdout,
                stderr: String::new(),
                return_code: None,
            }),
            Some(Reply::ConnectionLost(message)) => Err(Error::Connection(message)),
            None => Ok(RawOutput {
                stdout: "1\r\n".to_string(),
                stderr: String::new(),
                return_code: None,
            }),
        }
    }

    fn upload(
        &self,
        source: &TransferSource,
        remote_name: &str,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        info!("[dry-run] put {}", remote_name);
        let bytes_transferred = match source {
            TransferSource::Buffer(bytes) => bytes.len() as u64,
            TransferSource::Path(_) => 0,
        };
        self.uploads.borrow_mut().push(RecordedUpload {
            remote_name: remote_name.to_string(),
            options: options.clone(),
            source: source.clone(),
        });
        Ok(TransferResult {
            remote_paths: vec![join_remote(
                options.working_directory.as_deref(),
                remote_name,
            )],
            bytes_transferred,
        })
    }

    fn download(
        &self,
        remote_name: &str,
        target: &mut LocalTarget<'_>,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        info!("[dry-run] get {}", remote_name);
        self.downloads.borrow_mut().push(RecordedDownload {
            remote_name: remote_name.to_string(),
            options: options.clone(),
        });

        let content = self.files.borrow_mut().pop_front();
        let bytes_transferred = content.as_ref().map_or(0, |c| c.len() as u64);
        match (target, content) {
            (LocalTarget::Buffer(buffer), Some(content)) => buffer.extend_from_slice(&content),
            (LocalTarget::Path(path), Some(content)) => std::fs::write(path, &content)?,
            (LocalTarget::Path(path), None) => {
                info!("[dry-run] {} left untouched", path.display())
            }
            (LocalTarget::Buffer(_), None) => {}
        }
        Ok(TransferResult {
            remote_paths: vec![join_remote(
                options.working_directory.as_deref(),
                remote_name,
            )],
            bytes_transferred,
        })
    }

    fn exists(&self, remote_path: &str) -> Result<bool> {
        info!("[dry-run] exists {}", remote_path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reply_is_success_severity() {
        let session = DryRunSession::new("alpha1", "SYSTEM");
        let out = session.execute("SHOW TIME", &ExecOptions::default()).unwrap();
        assert_eq!(out.stdout.trim(), "1");
        assert_eq!(session.commands(), vec!["SHOW TIME"]);
    }

    #[test]
    fn test_replies_are_served_in_order() {
        let session = DryRunSession::new("alpha1", "SYSTEM");
        session.reply_ok("first").reply("second", 2);

        let options = ExecOptions::default();
        assert_eq!(session.execute("A", &options).unwrap().stdout, "first\r\n1\r\n");
        assert_eq!(session.execute("B", &options).unwrap().stdout, "second\r\n2\r\n");
        assert_eq!(session.execute("C", &options).unwrap().stdout, "1\r\n");
    }

    #[test]
    fn test_dropped_connection() {
        let session = DryRunSession::new("alpha1", "SYSTEM");
        session.drop_connection("reset by peer");
        let err = session
            .execute("SHOW TIME", &ExecOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_download_serves_queued_file() {
        let session = DryRunSession::new("alpha1", "SYSTEM");
        session.serve_file(b"line 1\nline 2\n");

        let mut buffer = Vec::new();
        let options = TransferOptions {
            working_directory: Some("/DKA0/LOGS".to_string()),
            ..TransferOptions::default()
        };
        let result = session
            .download("RUN.LOG", &mut LocalTarget::Buffer(&mut buffer), &options)
            .unwrap();

        assert_eq!(buffer, b"line 1\nline 2\n");
        assert_eq!(result.remote_paths, vec!["/DKA0/LOGS/RUN.LOG"]);
        assert_eq!(session.downloads()[0].remote_name, "RUN.LOG");
    }

    #[test]
    fn test_download_without_served_file_keeps_local_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = dir.path().join("OPERATOR.LOG");
        std::fs::write(&local, "local notes").unwrap();

        let session = DryRunSession::new("alpha1", "SYSTEM");
        let result = session
            .download(
                "OPERATOR.LOG",
                &mut LocalTarget::Path(local.clone()),
                &TransferOptions::default(),
            )
            .unwrap();

        assert_eq!(result.bytes_transferred, 0);
        assert_eq!(std::fs::read_to_string(&local).unwrap(), "local notes");
        assert_eq!(session.downloads().len(), 1);
    }
}
