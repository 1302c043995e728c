//! DCL command execution with `$SEVERITY`-based status.
//!
//! Every remote command goes through the same fixed pipeline:
//!
//! 1. account check: the session is logged in as the configured user
//! 2. auth mode: the session authenticated with a password, and the command
//!    is sent without a POSIX shell and with return codes ignored
//! 3. prefix rendering: `SET DEFAULT` and scoped prefixes are prepended
//! 4. execution: the command is wrapped in the severity probe and sent
//! 5. severity parsing: the last output line decides success
//!
//! A command that ran but failed is not an error: it comes back as an
//! [`ExecutionResult`] whose [`succeeded`](ExecutionResult::succeeded) is
//! false. Only transport and protocol problems are `Err`.

use crate::error::{Error, Result};
use crate::remote::session::{AuthMethod, ExecOptions, RemoteSession};
use crate::vms::context::{SessionContext, Target};
use crate::vms::severity::{probe_command, split_severity, Severity};
use console::style;
use log::{debug, warn};
use std::io;
use std::process::{Command, Output};

/// Result of one DCL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Output lines, without the severity line
    pub stdout: Vec<String>,
    pub stderr: String,
    pub severity: Severity,
}

impl ExecutionResult {
    /// True for odd severities.
    pub fn succeeded(&self) -> bool {
        self.severity.is_success()
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    /// Output lines joined with newlines.
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}

/// Asks the operator whether to go on after a failed command.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;
}

/// [`Confirm`] on the controlling terminal.
pub struct ConsoleConfirm;

impl Confirm for ConsoleConfirm {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let term = console::Term::stderr();
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        term.write_str(&format!("{} {} ", prompt, hint))?;
        let answer = term.read_line()?;
        Ok(match answer.trim().to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }
}

/// Prints `lines` tagged with the host, optionally after a `run:` header.
pub fn pretty_print(host: &str, header: Option<&str>, lines: &[String]) {
    let tag = style(format!("[{}]", host)).bold();
    if let Some(header) = header {
        println!("{} run: {}", tag, header);
    }
    for line in lines {
        println!("{} out: {}", tag, line);
    }
}

/// Runs DCL commands on one session.
pub struct VmsExecutor<S> {
    session: S,
    context: SessionContext,
    echo: bool,
}

impl<S: RemoteSession> VmsExecutor<S> {
    pub fn new(session: S, context: SessionContext) -> Self {
        Self {
            session,
            context,
            echo: true,
        }
    }

    /// Turns echoing of commands and output on or off.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn host(&self) -> &str {
        self.session.host()
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Runs `command`, echoing it and its output when echo is on.
    ///
    /// # Errors
    ///
    /// `Error::Connection` when the transport fails or the session is not
    /// usable, `Error::Protocol` when no severity line comes back.
    pub fn run(&self, command: &str) -> Result<ExecutionResult> {
        self.execute(command, self.echo)
    }

    /// Runs `command` without echoing anything.
    pub fn run_quiet(&self, command: &str) -> Result<ExecutionResult> {
        self.execute(command, false)
    }

    /// Runs `command`; if it fails, asks whether to continue.
    ///
    /// # Errors
    ///
    /// `Error::UserAbort` when the operator declines.
    pub fn safe_run(&self, command: &str, confirm: &mut dyn Confirm) -> Result<ExecutionResult> {
        let result = self.run(command)?;
        if result.failed() && !confirm.confirm("Command failed. Continue anyway?", false)? {
            return Err(Error::UserAbort(format!(
                "'{}' failed with {} and the operator chose to stop",
                command, result.severity
            )));
        }
        Ok(result)
    }

    /// Runs `command` in the local shell under the current scopes.
    pub fn run_local(&self, command: &str) -> io::Result<Output> {
        let rendered = self.context.render_prefix(command, Target::Local);
        debug!("Executing local command: {}", rendered);
        Command::new("sh").arg("-c").arg(&rendered).output()
    }

    fn execute(&self, command: &str, echo: bool) -> Result<ExecutionResult> {
        self.check_account()?;
        let options = self.force_auth_mode()?;
        let rendered = self.context.render_prefix(command, Target::Remote);
        let probed = probe_command(&rendered, self.context.terminal_width);

        if echo {
            pretty_print(self.host(), Some(command), &[]);
        }

        let raw = self.session.execute(&probed, &options)?;
        let (stdout, severity) = split_severity(&raw.stdout)?;
        debug!("'{}' finished with {}", command, severity);

        if echo {
            pretty_print(self.host(), None, &stdout);
        }

        Ok(ExecutionResult {
            stdout,
            stderr: raw.stderr,
            severity,
        })
    }

    fn check_account(&self) -> Result<()> {
        if let Some(expected) = &self.context.expected_user {
            let actual = self.session.user();
            if !expected.eq_ignore_ascii_case(actual) {
                return Err(Error::Connection(format!(
                    "session on {} is logged in as {} but {} was configured",
                    self.host(),
                    actual.to_uppercase(),
                    expected.to_uppercase()
                )));
            }
        }
        Ok(())
    }

    fn force_auth_mode(&self) -> Result<ExecOptions> {
        let method = self.session.auth_method();
        if method != AuthMethod::Password {
            warn!("Session on {} authenticated with {:?}", self.host(), method);
            return Err(Error::Connection(format!(
                "OpenVMS SSH2 sessions must use password authentication, {} used {:?}",
                self.host(),
                method
            )));
        }
        Ok(ExecOptions {
            suppress_output: true,
            force_success_return_code: true,
            use_shell: false,
        })
    }
}
