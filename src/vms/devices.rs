//! Open files on a device (`SHOW DEVICE /FILES`).
//!
//! The listing is written to a temporary file and fetched over SFTP, so
//! terminal width never truncates it. Its layout is a title line, a header
//! line whose column names are separated by two or more spaces, then one
//! line per open file:
//!
//! ```text
//! Files accessed on device $1$DGA100: (NODE1) on 19-OCT-2026 10:00:00.00
//! Process name      PID     File name
//! SYSTEM          20200415  [SYSMGR]OPERATOR.LOG;12
//! ```
//!
//! Records are split on whitespace and repaired against the header:
//! surplus leading tokens are merged into the first field (process names
//! may contain spaces) and missing trailing fields become `NLA0:` (the file
//! name is blank without enough privileges). A line with more than one
//! field containing spaces cannot be repaired correctly.

use crate::error::{Error, Result};
use crate::remote::session::{LocalTarget, RemoteSession};
use crate::vms::executor::VmsExecutor;
use crate::vms::script::TempRemoteFile;
use crate::vms::transfer::FileTransfer;
use log::debug;
use rand::Rng;

/// Filler for fields missing from a record.
pub const MISSING_FIELD: &str = "NLA0:";

const NAME_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileRecord {
    pub process_name: String,
    pub pid: String,
    pub file_name: String,
    /// Columns other than the three above, as (header, value)
    pub extra: Vec<(String, String)>,
}

/// Positions of the known columns, read from the header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileLayout {
    pub columns: Vec<String>,
    process_name: Option<usize>,
    pid: Option<usize>,
    file_name: Option<usize>,
}

impl OpenFileLayout {
    pub fn from_header(header: &str) -> Self {
        let columns: Vec<String> = header
            .split("  ")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        let find = |prefix: &str| {
            columns
                .iter()
                .position(|c| c.to_lowercase().starts_with(prefix))
        };

        Self {
            process_name: find("process"),
            pid: find("pid"),
            file_name: find("file"),
            columns,
        }
    }

    /// Splits `line` into exactly one value per column.
    pub fn repair(&self, line: &str) -> Vec<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let expected = self.columns.len();

        let mut values: Vec<String> = if tokens.len() > expected && expected > 0 {
            let surplus = tokens.len() - expected;
            std::iter::once(tokens[..=surplus].join(" "))
                .chain(tokens[surplus + 1..].iter().map(|t| t.to_string()))
                .collect()
        } else {
            tokens.iter().map(|t| t.to_string()).collect()
        };
        values.resize(expected, MISSING_FIELD.to_string());
        values
    }

    pub fn record(&self, line: &str) -> OpenFileRecord {
        let values = self.repair(line);
        let take = |index: Option<usize>| {
            index
                .and_then(|i| values.get(i).cloned())
                .unwrap_or_else(|| MISSING_FIELD.to_string())
        };
        let known = [self.process_name, self.pid, self.file_name];
        let extra = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !known.contains(&Some(*i)))
            .map(|(i, column)| (column.clone(), values[i].clone()))
            .collect();

        OpenFileRecord {
            process_name: take(self.process_name),
            pid: take(self.pid),
            file_name: take(self.file_name),
            extra,
        }
    }
}

/// Parses a `SHOW DEVICE /FILES /BRIEF` listing.
///
/// Returns `None` when there is no header line.
pub fn parse_open_files(listing: &str) -> Option<Vec<OpenFileRecord>> {
    let lines: Vec<&str> = listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 {
        return None;
    }

    let layout = OpenFileLayout::from_header(lines[1]);
    Some(lines[2..].iter().map(|line| layout.record(line)).collect())
}

fn random_name() -> String {
    let mut rng = rand::rng();
    (0..8)
        .map(|_| NAME_CHARSET[rng.random_range(0..NAME_CHARSET.len())] as char)
        .collect()
}

/// Lists the files open on `device`; `None` if the listing has no header.
///
/// # Errors
///
/// `Error::Parse` if `SHOW DEVICE` itself fails, e.g. for an unknown device.
pub fn open_files<S: RemoteSession>(
    exec: &VmsExecutor<S>,
    device: &str,
) -> Result<Option<Vec<OpenFileRecord>>> {
    let out_file = exec.context().temp_file(&format!("{}.DAT", random_name()));
    let listing_file = TempRemoteFile::new(exec, out_file);

    let result = exec.run_quiet(&format!(
        "SHOW DEVICE {} /FILES /NOSYSTEM /BRIEF /OUTPUT={}",
        device,
        listing_file.spec()
    ))?;
    if result.failed() {
        return Err(Error::Parse(format!(
            "SHOW DEVICE {} failed ({}): {}",
            device,
            result.severity,
            result.stdout_text()
        )));
    }

    let mut buffer = Vec::new();
    FileTransfer::new(exec).get(listing_file.spec(), LocalTarget::Buffer(&mut buffer))?;
    drop(listing_file);

    let listing = String::from_utf8_lossy(&buffer);
    debug!("Open file listing for {}:\n{}", device, listing);
    Ok(parse_open_files(&listing))
}
