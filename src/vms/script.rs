//! Upload, run, delete: DCL procedures executed from a temporary file.

use crate::error::{Error, Result};
use crate::remote::session::{RemoteSession, TransferSource};
use crate::vms::executor::{ExecutionResult, VmsExecutor};
use crate::vms::transfer::FileTransfer;
use log::{debug, warn};

/// Remote name used for scripts uploaded from memory.
pub const BUFFER_SCRIPT_NAME: &str = "VMSFAB_TEMP.TMP";

/// A remote file deleted (all versions) when the guard is dropped.
///
/// Deletion is fire-and-forget: a failure is logged, never returned.
pub struct TempRemoteFile<'a, S: RemoteSession> {
    exec: &'a VmsExecutor<S>,
    spec: String,
}

impl<'a, S: RemoteSession> TempRemoteFile<'a, S> {
    pub fn new(exec: &'a VmsExecutor<S>, spec: String) -> Self {
        Self { exec, spec }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }
}

impl<S: RemoteSession> Drop for TempRemoteFile<'_, S> {
    fn drop(&mut self) {
        debug!("Deleting remote temporary file {}", self.spec);
        match self.exec.run_quiet(&format!("DELETE /NOLOG {};*", self.spec)) {
            Ok(result) if result.failed() => {
                warn!("Could not delete {}: {}", self.spec, result.stdout_text())
            }
            Ok(_) => {}
            Err(e) => warn!("Could not delete {}: {}", self.spec, e),
        }
    }
}

/// Runs DCL procedures that live on the local side.
pub struct ScriptRunner<'a, S> {
    exec: &'a VmsExecutor<S>,
}

impl<'a, S: RemoteSession> ScriptRunner<'a, S> {
    pub fn new(exec: &'a VmsExecutor<S>) -> Self {
        Self { exec }
    }

    /// Where `script` is uploaded: its own file name, or
    /// [`BUFFER_SCRIPT_NAME`] for in-memory scripts, under the temp directory.
    pub fn remote_name(&self, script: &TransferSource) -> Result<String> {
        let name = match script {
            TransferSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    Error::Transfer(format!("{} does not name a script file", path.display()))
                })?,
            TransferSource::Buffer(_) => BUFFER_SCRIPT_NAME.to_string(),
        };
        Ok(self.exec.context().temp_file(&name))
    }

    /// Uploads `script`, runs it as `[prefix ]@<file>`, then deletes it.
    ///
    /// The delete is issued once the upload succeeded, whatever the outcome
    /// of the run, including transport errors.
    pub fn run_script(
        &self,
        script: impl Into<TransferSource>,
        prefix: Option<&str>,
    ) -> Result<ExecutionResult> {
        let script = script.into();
        let remote = self.remote_name(&script)?;

        FileTransfer::new(self.exec).put(script, &remote, false)?;
        let uploaded = TempRemoteFile::new(self.exec, remote);

        let command = match prefix {
            Some(prefix) => format!("{} @{}", prefix, uploaded.spec()),
            None => format!("@{}", uploaded.spec()),
        };
        self.exec.run(&command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::dry_run::DryRunSession;
    use crate::vms::context::SessionContext;

    fn executor() -> VmsExecutor<DryRunSession> {
        VmsExecutor::new(
            DryRunSession::new("alpha1", "SYSTEM"),
            SessionContext::default(),
        )
        .with_echo(false)
    }

    fn deletes(exec: &VmsExecutor<DryRunSession>) -> usize {
        exec.session()
            .commands()
            .iter()
            .filter(|c| c.contains("DELETE /NOLOG"))
            .count()
    }

    #[test]
    fn test_buffer_script_protocol() {
        let exec = executor();
        let result = ScriptRunner::new(&exec)
            .run_script(b"$ SHOW TIME\n".to_vec(), None)
            .unwrap();

        assert!(result.succeeded());
        let upload = &exec.session().uploads()[0];
        assert_eq!(upload.remote_name, "VMSFAB_TEMP.TMP");
        assert_eq!(
            upload.options.working_directory.as_deref(),
            Some("/TCPIP$SSH_HOME")
        );
        assert_eq!(
            exec.session().commands(),
            vec![
                "PIPE @TCPIP$SSH_HOME:VMSFAB_TEMP.TMP; WRITE SYS$OUTPUT $SEVERITY",
                "PIPE DELETE /NOLOG TCPIP$SSH_HOME:VMSFAB_TEMP.TMP;*; WRITE SYS$OUTPUT $SEVERITY",
            ]
        );
    }

    #[test]
    fn test_prefix_precedes_invocation() {
        let exec = executor();
        ScriptRunner::new(&exec)
            .run_script(b"EXIT\n".to_vec(), Some("MCR SYSMAN"))
            .unwrap();
        assert!(exec.session().commands()[0]
            .starts_with("PIPE MCR SYSMAN @TCPIP$SSH_HOME:VMSFAB_TEMP.TMP;"));
    }

    #[test]
    fn test_cleanup_after_failed_script() {
        let exec = executor();
        exec.session().reply("%DCL-E-OPENIN, error opening", 2);

        let result = ScriptRunner::new(&exec)
            .run_script(b"$ TYPE NOWHERE.TXT\n".to_vec(), None)
            .unwrap();

        assert!(result.failed());
        assert_eq!(deletes(&exec), 1);
    }

    #[test]
    fn test_cleanup_after_transport_error() {
        let exec = executor();
        exec.session().drop_connection("broken pipe");

        let result = ScriptRunner::new(&exec).run_script(b"$ EXIT\n".to_vec(), None);

        assert!(matches!(result, Err(Error::Connection(_))));
        assert_eq!(deletes(&exec), 1);
    }

    #[test]
    fn test_path_script_uses_its_file_name() {
        let exec = executor();
        let runner = ScriptRunner::new(&exec);
        let name = runner
            .remote_name(&TransferSource::from("scripts/BACKUP.COM"))
            .unwrap();
        assert_eq!(name, "TCPIP$SSH_HOME:BACKUP.COM");
    }
}
