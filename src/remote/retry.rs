//! Backoff for establishing SSH sessions.
//!
//! Only the connect/handshake/login sequence goes through here; DCL
//! commands are never replayed.

use crate::error::{Error, Result};
use log::{debug, warn};
use std::thread;
use std::time::Duration;

/// How often and how patiently to retry a connection.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; `HostConfig::connect_retries`
    pub max_retries: u32,
    /// Pause before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound on any single pause, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            ..Self::default()
        }
    }

    /// Pause before retry number `attempt + 1`, doubling up to the cap.
    fn delay_before(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64
            * self.backoff_multiplier.powi(attempt as i32))
            .min(self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }
}

/// Calls `connect` until it succeeds or the retries run out.
///
/// `what` names the connection in log messages.
///
/// # Errors
///
/// The error of the last attempt.
pub fn retry_with_backoff<T, F>(config: &RetryConfig, mut connect: F, what: &str) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = match connect() {
        Ok(session) => return Ok(session),
        Err(e) => {
            debug!("{} failed: {}", what, e);
            e
        }
    };

    for attempt in 1..=config.max_retries {
        let delay = config.delay_before(attempt - 1);
        warn!(
            "{} failed, retry {}/{} in {:?}",
            what, attempt, config.max_retries, delay
        );
        thread::sleep(delay);

        match connect() {
            Ok(session) => {
                debug!("{} established on retry {}", what, attempt);
                return Ok(session);
            }
            Err(e) => {
                debug!("{} retry {} failed: {}", what, attempt, e);
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Turns a failed connection into a message with OpenVMS-specific hints.
pub fn diagnose_ssh_error(error: &Error, host: &str, port: u16, user: &str) -> String {
    let error_str = error.to_string().to_lowercase();

    let mut suggestions = Vec::new();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("no route to host")
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", host));
        suggestions.push(format!(
            "• Check that TCPIP$SSH is running on port {} (SHOW SERVICE /ALL)",
            port
        ));
        suggestions.push("• Verify your network connection and firewall settings".to_string());
    }

    if error_str.contains("authentication")
        || error_str.contains("permission denied")
        || error_str.contains("password")
    {
        suggestions.push(format!(
            "• Check the password for {} (config file or {})",
            user.to_uppercase(),
            crate::config::PASSWORD_ENV
        ));
        suggestions.push(format!(
            "• Make sure the account {} is not disusered or expired (AUTHORIZE SHOW {})",
            user.to_uppercase(),
            user.to_uppercase()
        ));
        suggestions.push(
            "• The OpenVMS SSH2 server only accepts password logins here; keys and agents are never offered"
                .to_string(),
        );
    }

    if error_str.contains("host key") || error_str.contains("known_hosts") {
        suggestions.push(format!(
            "• Add the host to known_hosts: ssh-keyscan -p {} {} >> ~/.ssh/known_hosts",
            port, host
        ));
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push("• Check the SSH server log (TCPIP$SSH_RUN.LOG) on the host".to_string());
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {} {}@{}",
            port, user, host
        ));
    }

    format!(
        "SSH connection failed: {}\n\nTroubleshooting suggestions:\n{}",
        error,
        suggestions.join("\n")
    )
}
