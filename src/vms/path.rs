//! OpenVMS file specifications and their SFTP-style equivalents.
//!
//! `DKA0:[DIR1.DIR2]FILE.TXT;1` becomes directory `/DKA0/DIR1.DIR2` plus the
//! bare name `FILE.TXT;1`. Only the directory part is translated; names and
//! version numbers pass through untouched.

use std::fmt;

/// A remote file split into device, directory and name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemotePath {
    /// Device or logical name, without the trailing colon
    pub device: Option<String>,
    /// Directory without brackets, e.g. `DIR1.DIR2`
    pub directory: Option<String>,
    pub file_name: String,
}

impl RemotePath {
    /// Splits an OpenVMS file specification. Never fails: anything without
    /// `:` or `]` is a bare file name.
    pub fn parse(spec: &str) -> Self {
        let (device, rest) = match spec.split_once(':') {
            Some((device, rest)) => (Some(device.to_string()), rest),
            None => (None, spec),
        };

        let (directory, file_name) = match rest.split_once(']') {
            Some((dir, name)) => {
                let dir = dir.strip_prefix('[').unwrap_or(dir);
                (Some(dir.to_string()), name)
            }
            None => (None, rest),
        };

        Self {
            device: device.filter(|d| !d.is_empty()),
            directory: directory.filter(|d| !d.is_empty()),
            file_name: file_name.to_string(),
        }
    }

    /// Parses the SFTP form produced by [`RemotePath::posix_path`].
    pub fn from_posix(path: &str) -> Self {
        let (dir, file_name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        };

        let (device, directory) = match dir.strip_prefix('/') {
            Some(absolute) => match absolute.split_once('/') {
                Some((device, directory)) => (Some(device), Some(directory.replace('/', "."))),
                None => (Some(absolute), None),
            },
            None => (None, Some(dir.replace('/', "."))),
        };

        Self {
            device: device.filter(|d| !d.is_empty()).map(str::to_string),
            directory: directory.filter(|d| !d.is_empty()),
            file_name: file_name.to_string(),
        }
    }

    /// Directory in SFTP form: `/DEVICE/DIR`, `/DEVICE`, `DIR` or empty.
    pub fn posix_directory(&self) -> String {
        let root = self
            .device
            .as_ref()
            .map(|d| format!("/{}", d))
            .unwrap_or_default();
        match &self.directory {
            Some(dir) if root.is_empty() => dir.clone(),
            Some(dir) => format!("{}/{}", root.trim_end_matches('/'), dir),
            None => root,
        }
    }

    /// Full SFTP path of the file.
    pub fn posix_path(&self) -> String {
        let dir = self.posix_directory();
        if dir.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", dir, self.file_name)
        }
    }

    /// Re-serialises as an OpenVMS file specification.
    pub fn to_vms(&self) -> String {
        let mut spec = String::new();
        if let Some(device) = &self.device {
            spec.push_str(device);
            spec.push(':');
        }
        if let Some(directory) = &self.directory {
            spec.push('[');
            spec.push_str(directory);
            spec.push(']');
        }
        spec.push_str(&self.file_name);
        spec
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_vms())
    }
}

/// Appends `name` to a directory specification or logical name.
///
/// `SYS$SCRATCH` gets a colon, `DKA0:[TMP]` and `SYS$LOGIN:` are used as-is.
pub fn file_in(directory: &str, name: &str) -> String {
    if directory.is_empty() || directory.ends_with(':') || directory.ends_with(']') {
        format!("{}{}", directory, name)
    } else {
        format!("{}:{}", directory, name)
    }
}
