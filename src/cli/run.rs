//! `run`, `safe-run` and `local`: single commands.

use anyhow::Result;
use clap::Args;
use std::io::Write;

use super::{finish, ConnectArgs, DirectoryArgs};
use vmsfab::remote::{DryRunSession, RemoteSession};
use vmsfab::vms::{ConsoleConfirm, SessionContext, VmsExecutor};

#[derive(Args)]
#[command(about = "Run a DCL command; success is taken from $SEVERITY")]
pub struct RunCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// DCL command (words are joined with spaces)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let _cd = self.directory.enter(&exec);
        let result = exec.run(&self.command.join(" "))?;
        finish(&exec, &result)
    }
}

#[derive(Args)]
#[command(about = "Run a DCL command and ask whether to continue if it fails")]
pub struct SafeRunCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// DCL command (words are joined with spaces)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl SafeRunCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let _cd = self.directory.enter(&exec);
        let result = exec.safe_run(&self.command.join(" "), &mut ConsoleConfirm)?;
        if !exec.echo() {
            for line in &result.stdout {
                println!("{}", line);
            }
        }
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "Run a command in the local shell, honouring --cd")]
pub struct LocalCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// Shell command (words are joined with spaces)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl LocalCommand {
    pub fn execute(self) -> Result<()> {
        // No host involved: a dry-run session only carries the scopes.
        let session: Box<dyn RemoteSession> = Box::new(DryRunSession::new("localhost", ""));
        let exec = VmsExecutor::new(session, SessionContext::default());
        let _cd = self.directory.enter(&exec);

        let output = exec.run_local(&self.command.join(" "))?;
        std::io::stdout().write_all(&output.stdout)?;
        std::io::stderr().write_all(&output.stderr)?;
        if !output.status.success() {
            anyhow::bail!("local command failed: {}", output.status);
        }
        Ok(())
    }
}
