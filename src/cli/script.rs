//! `script`: upload a DCL procedure, run it, delete it.

use anyhow::Result;
use clap::Args;
use std::io::Read;
use std::path::PathBuf;

use super::{finish, ConnectArgs, DirectoryArgs};
use vmsfab::remote::TransferSource;
use vmsfab::vms::cluster::SYSMAN_PREFIX;
use vmsfab::vms::ScriptRunner;

#[derive(Args)]
#[command(about = "Run a local DCL procedure on the host")]
pub struct ScriptCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    #[command(flatten)]
    pub directory: DirectoryArgs,

    /// Procedure file, or `-` to read it from stdin
    pub script: PathBuf,

    /// Command the procedure is fed to, e.g. "MCR SYSMAN"
    #[arg(long, conflicts_with = "sysman")]
    pub prefix: Option<String>,

    /// Feed the procedure to SYSMAN (cluster-wide)
    #[arg(long)]
    pub sysman: bool,
}

impl ScriptCommand {
    pub fn execute(self) -> Result<()> {
        let source = if self.script.as_os_str() == "-" {
            let mut buffer = Vec::new();
            std::io::stdin().read_to_end(&mut buffer)?;
            TransferSource::Buffer(buffer)
        } else {
            TransferSource::Path(self.script.clone())
        };

        let prefix = if self.sysman {
            Some(SYSMAN_PREFIX.to_string())
        } else {
            self.prefix.clone()
        };

        let exec = self.connection.connect()?;
        let _cd = self.directory.enter(&exec);
        let result = ScriptRunner::new(&exec).run_script(source, prefix.as_deref())?;
        finish(&exec, &result)
    }
}
