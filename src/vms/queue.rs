//! Batch queue jobs: find the entries of a named job, resubmit or delete them.
//!
//! A [`QueueJob`] is a snapshot taken when it is loaded. Entries may finish
//! or be deleted afterwards; acting on them then simply yields a failed
//! [`ExecutionResult`] for that entry.

use crate::error::{Error, Result};
use crate::remote::session::RemoteSession;
use crate::vms::executor::{ExecutionResult, VmsExecutor};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// What is needed to submit an entry again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Procedure file the entry runs, as `SUBMIT` expects it
    pub job_name: String,
    /// Submission qualifiers without their leading `/`
    pub parameters: Vec<String>,
}

impl QueueEntry {
    /// `SUBMIT <file> /<qualifier>/<qualifier>...`
    pub fn submit_command(&self) -> String {
        format!("SUBMIT {} /{}", self.job_name, self.parameters.join("/"))
    }
}

/// Entry ids of `SHOW QUEUE` lines that mention `name` (case-insensitive).
pub fn parse_queue_listing(lines: &[String], name: &str) -> Vec<String> {
    let name = name.to_uppercase();
    lines
        .iter()
        .filter(|line| line.to_uppercase().contains(&name))
        .filter_map(|line| line.split_whitespace().next())
        .filter(|id| id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Reads a `SHOW ENTRY /FULL` listing.
///
/// The last line names the procedure file (`File: _DEV:[DIR]NAME.COM;1`);
/// everything from the line containing "Submitted" up to that line holds
/// the qualifiers.
pub fn parse_entry_details(lines: &[String]) -> Result<QueueEntry> {
    let last = lines
        .last()
        .ok_or_else(|| Error::Parse("empty SHOW ENTRY output".to_string()))?;
    let job_name = last
        .split_whitespace()
        .nth(1)
        .map(|file| file.strip_prefix('_').unwrap_or(file).to_string())
        .ok_or_else(|| Error::Parse(format!("no file specification in '{}'", last.trim())))?;

    let start = lines
        .iter()
        .position(|line| line.to_lowercase().contains("submitted"))
        .ok_or_else(|| Error::Parse("no 'Submitted' line in SHOW ENTRY output".to_string()))?;

    let joined: String = lines[start..lines.len() - 1]
        .iter()
        .map(|line| line.trim())
        .collect();
    let parameters = joined
        .split('/')
        .skip(1)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    Ok(QueueEntry {
        job_name,
        parameters,
    })
}

/// A named batch job and the queue entries it had when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueJob {
    /// Upper-cased job name
    pub name: String,
    pub entries: BTreeMap<String, QueueEntry>,
}

impl QueueJob {
    /// Finds every entry of job `name` and reads its submission details.
    ///
    /// An entry that is gone by the time `SHOW ENTRY` runs is left out.
    ///
    /// # Errors
    ///
    /// `Error::Parse` when `SHOW ENTRY` succeeds but its output cannot be read.
    pub fn load<S: RemoteSession>(exec: &VmsExecutor<S>, name: &str) -> Result<Self> {
        let name = name.to_uppercase();
        let listing = exec.run_quiet(&format!(
            "SHOW QUEUE /BATCH /ALL | SEA SYS$PIPE {}",
            name
        ))?;

        let mut entries = BTreeMap::new();
        for entry_id in parse_queue_listing(&listing.stdout, &name) {
            let details = exec.run_quiet(&format!("SHOW ENTRY {} /FULL", entry_id))?;
            if details.failed() {
                warn!(
                    "Skipping entry {} of {}: {}",
                    entry_id,
                    name,
                    details.stdout_text().trim()
                );
                continue;
            }
            let entry = parse_entry_details(&details.stdout)?;
            debug!("Entry {}: {:?}", entry_id, entry);
            entries.insert(entry_id, entry);
        }

        info!("Job {} has {} queue entries", name, entries.len());
        Ok(Self { name, entries })
    }

    fn selected(&self, entry_id: Option<&str>) -> Result<Vec<(&String, &QueueEntry)>> {
        match entry_id {
            Some(id) => self
                .entries
                .get_key_value(id)
                .map(|pair| vec![pair])
                .ok_or_else(|| Error::UnknownEntry(id.to_string())),
            None => Ok(self.entries.iter().collect()),
        }
    }

    /// Submits one entry (or every entry) again with its original qualifiers.
    pub fn resubmit<S: RemoteSession>(
        &self,
        exec: &VmsExecutor<S>,
        entry_id: Option<&str>,
    ) -> Result<Vec<ExecutionResult>> {
        self.selected(entry_id)?
            .into_iter()
            .map(|(_, entry)| exec.run(&entry.submit_command()))
            .collect()
    }

    /// Deletes one entry (or every entry) from its queue.
    pub fn stop<S: RemoteSession>(
        &self,
        exec: &VmsExecutor<S>,
        entry_id: Option<&str>,
    ) -> Result<Vec<ExecutionResult>> {
        self.selected(entry_id)?
            .into_iter()
            .map(|(id, _)| exec.run(&format!("DELETE /ENTRY={}", id)))
            .collect()
    }
}

impl fmt::Display for QueueJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        write!(f, "Job name {}, entry number(s) {}", self.name, ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::dry_run::DryRunSession;
    use crate::vms::context::SessionContext;

    const SHOW_QUEUE: &str = "\
Batch queue SYS$BATCH, idle, on NODE1::
   4821  NIGHTLY_BACKUP  SYSTEM          Holding until 20-OCT-2026 02:00:00.00
   4907  nightly_backup  SYSTEM          Pending";

    const SHOW_ENTRY: &str = "\
  Entry  Jobname         Username     Blocks  Status
  -----  -------         --------     ------  ------
   4821  NIGHTLY_BACKUP  SYSTEM               Holding until 20-OCT-2026 02:00:00.00
         On idle batch queue SYS$BATCH
         Submitted 19-OCT-2026 10:00:00.00 /KEEP /LOG=SYS$MANAGER:BACKUP.LOG
           /NOPRINTER /PRIORITY=100
         File: _$1$DGA100:[SYSMGR]NIGHTLY_BACKUP.COM;1";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn executor() -> VmsExecutor<DryRunSession> {
        VmsExecutor::new(
            DryRunSession::new("node1", "SYSTEM"),
            SessionContext::default(),
        )
        .with_echo(false)
    }

    #[test]
    fn test_parse_queue_listing() {
        assert_eq!(
            parse_queue_listing(&lines(SHOW_QUEUE), "nightly_backup"),
            vec!["4821", "4907"]
        );
        assert!(parse_queue_listing(&lines(SHOW_QUEUE), "OTHER").is_empty());
    }

    #[test]
    fn test_parse_entry_details() {
        let entry = parse_entry_details(&lines(SHOW_ENTRY)).unwrap();
        assert_eq!(entry.job_name, "$1$DGA100:[SYSMGR]NIGHTLY_BACKUP.COM;1");
        assert_eq!(
            entry.parameters,
            vec![
                "KEEP",
                "LOG=SYS$MANAGER:BACKUP.LOG",
                "NOPRINTER",
                "PRIORITY=100"
            ]
        );
        assert_eq!(
            entry.submit_command(),
            "SUBMIT $1$DGA100:[SYSMGR]NIGHTLY_BACKUP.COM;1 \
             /KEEP/LOG=SYS$MANAGER:BACKUP.LOG/NOPRINTER/PRIORITY=100"
        );
    }

    #[test]
    fn test_parse_entry_details_errors() {
        assert!(matches!(parse_entry_details(&[]), Err(Error::Parse(_))));
        assert!(matches!(
            parse_entry_details(&lines("   4821  JOB\n   File: _DKA0:[X]JOB.COM;1")),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_load_resubmit_and_stop() {
        let exec = executor();
        exec.session()
            .reply_ok("   4821  NIGHTLY_BACKUP  SYSTEM   Holding")
            .reply_ok(SHOW_ENTRY);

        let job = QueueJob::load(&exec, "nightly_backup").unwrap();
        assert_eq!(job.name, "NIGHTLY_BACKUP");
        assert!(job.entries.contains_key("4821"));
        assert_eq!(job.to_string(), "Job name NIGHTLY_BACKUP, entry number(s) 4821");

        let results = job.resubmit(&exec, None).unwrap();
        assert_eq!(results.len(), 1);
        let results = job.stop(&exec, Some("4821")).unwrap();
        assert!(results[0].succeeded());

        let commands = exec.session().commands();
        assert!(commands[0].contains("SHOW QUEUE /BATCH /ALL | SEA SYS$PIPE NIGHTLY_BACKUP"));
        assert!(commands[1].contains("SHOW ENTRY 4821 /FULL"));
        assert!(commands[2].contains(
            "SUBMIT $1$DGA100:[SYSMGR]NIGHTLY_BACKUP.COM;1 /KEEP/LOG=SYS$MANAGER:BACKUP.LOG/NOPRINTER/PRIORITY=100"
        ));
        assert!(commands[3].contains("DELETE /ENTRY=4821"));
    }

    #[test]
    fn test_stop_completed_entry_is_a_failed_result() {
        let exec = executor();
        exec.session()
            .reply_ok("   4821  NIGHTLY_BACKUP  SYSTEM   Holding")
            .reply_ok(SHOW_ENTRY)
            .reply("%JBC-E-NOSUCHENT, no such entry", 2);

        let job = QueueJob::load(&exec, "NIGHTLY_BACKUP").unwrap();
        let results = job.stop(&exec, None).unwrap();
        assert!(results[0].failed());
    }

    #[test]
    fn test_unknown_entry() {
        let exec = executor();
        let job = QueueJob::load(&exec, "NOTHING").unwrap();
        assert!(job.entries.is_empty());
        assert!(matches!(
            job.resubmit(&exec, Some("1")),
            Err(Error::UnknownEntry(_))
        ));
    }

    #[test]
    fn test_entry_gone_before_details_is_skipped() {
        let exec = executor();
        exec.session()
            .reply_ok(
                "   4821  NIGHTLY_BACKUP  SYSTEM   Holding\n   4822  NIGHTLY_BACKUP  SYSTEM   Executing",
            )
            .reply_ok(SHOW_ENTRY)
            .reply("%JBC-E-NOSUCHENT, no such entry", 2);

        let job = QueueJob::load(&exec, "NIGHTLY_BACKUP").unwrap();
        assert_eq!(job.entries.keys().collect::<Vec<_>>(), vec!["4821"]);
        assert_eq!(job.to_string(), "Job name NIGHTLY_BACKUP, entry number(s) 4821");
    }

    #[test]
    fn test_malformed_entry_details_fail_the_load() {
        let exec = executor();
        exec.session()
            .reply_ok("   4821  NIGHTLY_BACKUP  SYSTEM   Holding")
            .reply_ok("   4821  NIGHTLY_BACKUP\n   File: _DKA0:[X]NIGHTLY_BACKUP.COM;1");

        assert!(matches!(
            QueueJob::load(&exec, "NIGHTLY_BACKUP"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_load_is_repeatable() {
        let load = || {
            let exec = executor();
            exec.session()
                .reply_ok(SHOW_QUEUE)
                .reply_ok(SHOW_ENTRY)
                .reply_ok(SHOW_ENTRY);
            QueueJob::load(&exec, "NIGHTLY_BACKUP").unwrap()
        };
        assert_eq!(load(), load());
    }
}
