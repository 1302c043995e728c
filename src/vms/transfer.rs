//! SFTP uploads and downloads addressed with OpenVMS file specifications.
//!
//! The SFTP server runs as a detached process, so logical names such as
//! `SYS$LOGIN` or `SYS$SCRATCH` are often undefined for it and absolute
//! paths confuse it. Each transfer therefore sets the working directory to
//! the translated directory and hands the server only the bare file name.

use crate::error::Result;
use crate::remote::session::{
    LocalTarget, RemoteSession, TransferOptions, TransferResult, TransferSource,
};
use crate::vms::executor::{pretty_print, VmsExecutor};
use crate::vms::path::RemotePath;
use log::debug;

/// Transfers files through a [`VmsExecutor`]'s session.
pub struct FileTransfer<'a, S> {
    exec: &'a VmsExecutor<S>,
}

impl<'a, S: RemoteSession> FileTransfer<'a, S> {
    pub fn new(exec: &'a VmsExecutor<S>) -> Self {
        Self { exec }
    }

    /// Options every transfer uses; only the directory varies.
    fn options(&self, use_glob: bool) -> TransferOptions {
        TransferOptions {
            working_directory: self.exec.context().working_directory(),
            use_glob,
            use_sudo: false,
            mirror_local_mode: false,
            mode: None,
            temp_dir: String::new(),
        }
    }

    /// Uploads `source` (a local path or an in-memory buffer) to `remote`.
    pub fn put(
        &self,
        source: impl Into<TransferSource>,
        remote: &str,
        use_glob: bool,
    ) -> Result<TransferResult> {
        let path = RemotePath::parse(remote);
        let source = source.into().absolutize()?;
        debug!("put {} -> {}", describe(&source), path);

        let _scope = self.exec.context().with_directory(&path.posix_directory());
        self.exec
            .session()
            .upload(&source, &path.file_name, &self.options(use_glob))
    }

    /// Downloads `remote` into a local path or an in-memory buffer.
    pub fn get(&self, remote: &str, target: LocalTarget<'_>) -> Result<TransferResult> {
        let path = RemotePath::parse(remote);
        let mut target = target.absolutize()?;
        debug!("get {}", path);

        let _scope = self.exec.context().with_directory(&path.posix_directory());
        self.exec
            .session()
            .download(&path.file_name, &mut target, &self.options(false))
    }

    /// Checks whether `remote` exists.
    pub fn exists(&self, remote: &str) -> Result<bool> {
        let path = RemotePath::parse(remote);
        self.exec.session().exists(&path.posix_path())
    }

    /// Returns the contents of `remote`, echoing it line by line.
    ///
    /// Reading through SFTP instead of `TYPE` keeps long lines intact.
    pub fn print_file(&self, remote: &str, show_header: bool) -> Result<String> {
        let mut buffer = Vec::new();
        self.get(remote, LocalTarget::Buffer(&mut buffer))?;
        let content = String::from_utf8_lossy(&buffer).to_string();

        if self.exec.echo() {
            let header = format!("Showing contents of file {}:", remote);
            let lines: Vec<String> = content.lines().map(str::to_string).collect();
            pretty_print(
                self.exec.host(),
                show_header.then_some(header.as_str()),
                &lines,
            );
        }
        Ok(content)
    }
}

fn describe(source: &TransferSource) -> String {
    match source {
        TransferSource::Path(path) => path.display().to_string(),
        TransferSource::Buffer(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
