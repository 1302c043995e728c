//! Per-session state: working directory and command prefixes.
//!
//! Both are stacks that only change through scope guards, so leaving a
//! scope (normally, by `?`, or by unwinding) restores exactly what the
//! enclosing scope had.

use crate::config::{HostConfig, DEFAULT_TEMP_DIR};
use std::cell::RefCell;

/// Where a rendered command will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The local POSIX shell
    Local,
    /// DCL on the OpenVMS host
    Remote,
}

/// State shared by every helper working on one session.
///
/// Not `Sync`: one session is driven by one thread of control.
#[derive(Debug)]
pub struct SessionContext {
    pub(crate) directories: RefCell<Vec<String>>,
    pub(crate) prefixes: RefCell<Vec<String>>,
    /// Width forced with `SET TERMINAL /WIDTH` before each command
    pub terminal_width: Option<u16>,
    /// Directory or logical name for temporary files
    pub temp_dir: String,
    /// Account the session must be logged in as
    pub expected_user: Option<String>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            directories: RefCell::new(Vec::new()),
            prefixes: RefCell::new(Vec::new()),
            terminal_width: None,
            temp_dir: DEFAULT_TEMP_DIR.to_string(),
            expected_user: None,
        }
    }
}

/// Pops a scoped stack entry back off when dropped.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    stack: &'a RefCell<Vec<String>>,
    depth: usize,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().truncate(self.depth);
    }
}

fn push_scope<'a>(stack: &'a RefCell<Vec<String>>, value: &str) -> ScopeGuard<'a> {
    let mut entries = stack.borrow_mut();
    let depth = entries.len();
    entries.push(value.to_string());
    ScopeGuard { stack, depth }
}

impl SessionContext {
    pub fn from_host_config(config: &HostConfig) -> Self {
        Self {
            terminal_width: config.terminal_width,
            temp_dir: config.temp_dir.clone(),
            expected_user: Some(config.user.clone()),
            ..Self::default()
        }
    }

    /// Makes `directory` the working directory until the guard is dropped.
    pub fn with_directory(&self, directory: &str) -> ScopeGuard<'_> {
        push_scope(&self.directories, directory)
    }

    /// Runs `f` with `directory` as the working directory.
    pub fn in_directory<T>(&self, directory: &str, f: impl FnOnce() -> T) -> T {
        let _scope = self.with_directory(directory);
        f()
    }

    /// Adds a command run before every command until the guard is dropped.
    pub fn with_prefix(&self, prefix: &str) -> ScopeGuard<'_> {
        push_scope(&self.prefixes, prefix)
    }

    /// The innermost working directory, if any scope set one.
    pub fn working_directory(&self) -> Option<String> {
        self.directories.borrow().last().cloned()
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.prefixes.borrow().clone()
    }

    /// Prepends the working directory and prefixes to `command`.
    ///
    /// Remote commands get `SET DEFAULT <dir> ; <prefix> ; <command>`; local
    /// ones get the POSIX `cd <dir> && <prefix> && <command>`.
    pub fn render_prefix(&self, command: &str, target: Target) -> String {
        let mut parts = Vec::new();
        let directory = self.working_directory().filter(|d| !d.is_empty());

        let glue = match target {
            Target::Remote => {
                if let Some(dir) = directory {
                    parts.push(format!("SET DEFAULT {}", dir));
                }
                " ; "
            }
            Target::Local => {
                if let Some(dir) = directory {
                    parts.push(format!("cd {}", shell_quote(&dir)));
                }
                " && "
            }
        };

        parts.extend(self.prefixes());
        parts.push(command.to_string());
        parts.join(glue)
    }

    /// Temporary file `name` under the session's temp directory.
    pub fn temp_file(&self, name: &str) -> String {
        crate::vms::path::file_in(&self.temp_dir, name)
    }
}

fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-~".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
