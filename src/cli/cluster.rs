//! Cluster commands: SYSMAN fan-out, membership, shadow sets, open files.

use anyhow::Result;
use clap::Args;
use console::style;

use super::{finish, ConnectArgs};
use vmsfab::vms::cluster::DEFAULT_SHADOW_SET;
use vmsfab::vms::{open_files, Cluster};

#[derive(Args)]
#[command(about = "Run DCL commands on every cluster member through SYSMAN")]
pub struct ClusterwideCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Commands to run, one argument each (quote commands that contain spaces)
    #[arg(required = true)]
    pub commands: Vec<String>,
}

impl ClusterwideCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let result = Cluster::new(&exec).run_clusterwide(self.commands, true)?;
        finish(&exec, &result)
    }
}

#[derive(Args)]
#[command(about = "List the current cluster members")]
pub struct ClusterNodesCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,
}

impl ClusterNodesCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        for node in Cluster::new(&exec).nodes()? {
            println!("{}", node);
        }
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "List the physical members of a shadow set")]
pub struct ShadowsetCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Shadow set virtual unit
    #[arg(default_value = DEFAULT_SHADOW_SET)]
    pub shadow_set: String,
}

impl ShadowsetCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let members = Cluster::new(&exec).shadow_set_members(&self.shadow_set)?;
        if !exec.echo() {
            for member in members {
                println!("{}", member);
            }
        }
        Ok(())
    }
}

#[derive(Args)]
#[command(about = "List files open on a device")]
pub struct LsofCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    /// Device name, e.g. DKA100:
    pub device: String,
}

impl LsofCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;
        let Some(records) = open_files(&exec, &self.device)? else {
            println!("No open file listing for {}", self.device);
            return Ok(());
        };

        println!(
            "{:<16} {:<10} {}",
            style("Process name").bold(),
            style("PID").bold(),
            style("File name").bold()
        );
        for record in &records {
            println!(
                "{:<16} {:<10} {}",
                record.process_name, record.pid, record.file_name
            );
        }
        println!();
        println!("{} open file(s) on {}", records.len(), self.device);
        Ok(())
    }
}
