//! `queue`: inspect, resubmit or stop the batch entries of a named job.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::ConnectArgs;
use vmsfab::vms::QueueJob;

#[derive(Args)]
#[command(about = "Manage the batch queue entries of a job")]
pub struct QueueCommand {
    #[command(flatten)]
    pub connection: ConnectArgs,

    #[command(subcommand)]
    pub action: QueueAction,
}

#[derive(Subcommand)]
pub enum QueueAction {
    /// Show the entries of a job and how they were submitted
    Show {
        /// Job name (case-insensitive)
        name: String,
    },

    /// Submit entries again with their original qualifiers
    Resubmit {
        /// Job name (case-insensitive)
        name: String,

        /// Only this entry number (default: every entry of the job)
        #[arg(long)]
        entry: Option<String>,
    },

    /// Delete entries from their queue
    Stop {
        /// Job name (case-insensitive)
        name: String,

        /// Only this entry number (default: every entry of the job)
        #[arg(long)]
        entry: Option<String>,
    },
}

impl QueueCommand {
    pub fn execute(self) -> Result<()> {
        let exec = self.connection.connect()?;

        match &self.action {
            QueueAction::Show { name } => {
                let job = QueueJob::load(&exec, name)?;
                println!("{}", job);
                for (id, entry) in &job.entries {
                    println!("  {}: {}", id, entry.submit_command());
                }
            }
            QueueAction::Resubmit { name, entry } => {
                let job = QueueJob::load(&exec, name)?;
                let results = job.resubmit(&exec, entry.as_deref())?;
                let failed = results.iter().filter(|r| r.failed()).count();
                println!("Resubmitted {} of {} entries", results.len() - failed, results.len());
                if failed > 0 {
                    anyhow::bail!("{} SUBMIT command(s) failed", failed);
                }
            }
            QueueAction::Stop { name, entry } => {
                let job = QueueJob::load(&exec, name)?;
                let results = job.stop(&exec, entry.as_deref())?;
                for result in results.iter().filter(|r| r.failed()) {
                    eprintln!("{}", result.stdout_text().trim_end());
                }
                println!("Stopped {} entries", results.iter().filter(|r| r.succeeded()).count());
            }
        }

        Ok(())
    }
}
