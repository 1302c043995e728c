pub mod cluster;
pub mod completions;
pub mod config;
pub mod queue;
pub mod run;
pub mod script;
pub mod transfer;

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use vmsfab::config::{Config, PASSWORD_ENV};
use vmsfab::remote::{DryRunSession, RemoteSession, SshSession};
use vmsfab::vms::{ExecutionResult, ScopeGuard, SessionContext, VmsExecutor};

pub type Executor = VmsExecutor<Box<dyn RemoteSession>>;

/// Flags shared by every command that talks to a host.
#[derive(Args, Clone)]
pub struct ConnectArgs {
    /// Configured host name or user@host[:port] (default: config default)
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Override the temporary directory
    #[arg(long, global = true)]
    pub temp_dir: Option<String>,

    /// Force this terminal width before every command
    #[arg(long, global = true)]
    pub terminal_width: Option<u16>,

    /// Don't echo commands and output tagged with the host
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print commands instead of sending them; every command succeeds
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl ConnectArgs {
    /// Resolves the host and opens a session (or a dry-run stand-in).
    pub fn connect(&self) -> Result<Executor> {
        let config = Config::load()?;
        let mut host = config.resolve_host(self.host.as_deref())?;

        if let Some(temp_dir) = &self.temp_dir {
            host.temp_dir = temp_dir.clone();
        }
        if let Some(width) = self.terminal_width {
            host.terminal_width = Some(width);
        }

        let session: Box<dyn RemoteSession> = if self.dry_run {
            Box::new(DryRunSession::new(&host.host, &host.user))
        } else {
            if host.password.is_none() && std::env::var(PASSWORD_ENV).is_err() {
                let prompt = format!("Password for {}: ", host.connection_string());
                let term = console::Term::stderr();
                term.write_str(&prompt)?;
                host.password = Some(
                    term.read_secure_line()
                        .context("Failed to read password")?,
                );
            }
            Box::new(SshSession::connect(host.clone())?)
        };

        debug!("Session open on {}", host.connection_string());
        let echo = config.defaults.echo && !self.quiet;
        Ok(VmsExecutor::new(session, SessionContext::from_host_config(&host)).with_echo(echo))
    }

}

/// `--cd`, for the commands that run something in a working directory.
#[derive(Args, Clone)]
pub struct DirectoryArgs {
    /// Working directory (SET DEFAULT remotely, cd locally) for the command
    #[arg(long)]
    pub cd: Option<String>,
}

impl DirectoryArgs {
    /// Enters the `--cd` directory, if one was given.
    pub fn enter<'a>(&self, exec: &'a Executor) -> Option<ScopeGuard<'a>> {
        self.cd
            .as_deref()
            .map(|dir| exec.context().with_directory(dir))
    }
}

/// Prints plain output when echo is off, and turns failure into an error.
pub fn finish(exec: &Executor, result: &ExecutionResult) -> Result<()> {
    if !exec.echo() {
        for line in &result.stdout {
            println!("{}", line);
        }
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr.trim_end());
    }
    if result.failed() {
        anyhow::bail!("command failed with {}", result.severity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_cd_accepted_where_it_is_used() {
        for args in [
            vec!["vmsfab", "run", "--cd", "SYS$LOGIN", "DIR"],
            vec!["vmsfab", "safe-run", "--cd", "SYS$LOGIN", "DIR"],
            vec!["vmsfab", "local", "--cd", "/tmp", "ls"],
            vec!["vmsfab", "script", "--cd", "SYS$LOGIN", "BUILD.COM"],
        ] {
            assert!(Cli::try_parse_from(&args).is_ok(), "{:?}", args);
        }
    }

    #[test]
    fn test_cd_rejected_where_it_would_be_ignored() {
        for args in [
            vec!["vmsfab", "cluster-nodes", "--cd", "SYS$LOGIN"],
            vec!["vmsfab", "lsof", "--cd", "SYS$LOGIN", "DKA100:"],
            vec!["vmsfab", "shadowset", "--cd", "SYS$LOGIN"],
            vec!["vmsfab", "clusterwide", "--cd", "SYS$LOGIN", "SHOW TIME"],
            vec!["vmsfab", "queue", "--cd", "SYS$LOGIN", "show", "NIGHTLY"],
        ] {
            assert!(Cli::try_parse_from(&args).is_err(), "{:?}", args);
        }
    }

    #[test]
    fn test_connection_flags_are_global() {
        assert!(Cli::try_parse_from([
            "vmsfab", "queue", "stop", "NIGHTLY", "--entry", "4821", "--dry-run", "-q"
        ])
        .is_ok());
    }
}
