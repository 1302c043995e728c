//! `put`, `get`, `cat` and `exists`: SFTP with OpenVMS file specifications.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::ConnectArgs;
use vmsfab::remote::LocalTarget;
use vmsfab::vms::{FileTransfer, RemotePath};

#[derive(Args)]
#[command(about = "Upload a local file")]
pub struct PutCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Local file; `*` and `?` in the name are expanded
    pub local: PathBuf,

    /// Remote file specification (default: same name in the temp directory)
    pub remote: Option<String>,

    /// Take the local name literally
    #[arg(long)]
    pub no_glob: bool,
}

impl PutCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let remote = match self.remote {
            Some(remote) => remote,
            None => {
                let name = self
                    .local
                    .file_name()
                    .ok_or_else(|| anyhow::anyhow!("{} is not a file", self.local.display()))?;
                exec.context().temp_file(&name.to_string_lossy())
            }
        };

        let result = FileTransfer::new(&exec).put(self.local.clone(), &remote, !self.no_glob)?;
        for path in &result.remote_paths {
            println!("Uploaded {}", path);
        }
        println!("{} bytes transferred", result.bytes_transferred);
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "Download a remote file")]
pub struct GetCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Remote file specification, e.g. SYS$MANAGER:OPERATOR.LOG
    pub remote: String,

    /// Local destination (default: the remote file name in the current directory)
    pub local: Option<PathBuf>,
}

impl GetCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let local = self
            .local
            .unwrap_or_else(|| PathBuf::from(RemotePath::parse(&self.remote).file_name));

        let result = FileTransfer::new(&exec).get(&self.remote, LocalTarget::Path(local.clone()))?;
        println!(
            "Downloaded {} to {} ({} bytes)",
            self.remote,
            local.display(),
            result.bytes_transferred
        );
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "Print a remote file without going through TYPE")]
pub struct CatCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Remote file specification
    pub remote: String,

    /// Don't print the "Showing contents" header
    #[arg(long)]
    pub no_header: bool,
}

impl CatCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let content = FileTransfer::new(&exec).print_file(&self.remote, !self.no_header)?;
        if !exec.echo() {
            print!("{}", content);
        }
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "Check whether a remote file exists")]
pub struct ExistsCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Remote file specification
    pub remote: String,
}

impl ExistsCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        if FileTransfer::new(&exec).exists(&self.remote)? {
            println!("{} exists", self.remote);
            Ok(())
        } else {
            anyhow::bail!("{} does not exist", self.remote)
        }
    }
}
