//! SSH2 transport for OpenVMS hosts.
//!
//! The SSH2 server shipped with TCP/IP Services does not cope with clients
//! that offer a key before falling back to a password, so this session only
//! ever authenticates with a password and never talks to an agent.

use crate::config::{HostConfig, PASSWORD_ENV};
use crate::error::{Error, Result};
use crate::remote::retry::{diagnose_ssh_error, retry_with_backoff, RetryConfig};
use crate::remote::session::{
    join_remote, AuthMethod, ExecOptions, LocalTarget, RawOutput, RemoteSession, TransferOptions,
    TransferResult, TransferSource,
};
use log::{debug, info};
use ssh2::Session;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An authenticated SSH2 session to one OpenVMS host.
pub struct SshSession {
    config: HostConfig,
    session: Session,
}

impl SshSession {
    /// Connects and authenticates, retrying the connection with backoff.
    ///
    /// The password comes from the configuration, then from the
    /// `VMSFAB_PASSWORD` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` with troubleshooting suggestions if no
    /// password is available or the host can't be reached or logged into.
    pub fn connect(config: HostConfig) -> Result<Self> {
        let password = config
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .ok_or_else(|| {
                Error::Connection(format!(
                    "No password for {}: set it in the config file or in {}",
                    config.connection_string(),
                    PASSWORD_ENV
                ))
            })?;

        info!("Connecting to {}", config.connection_string());

        let retry_config = RetryConfig::new(config.connect_retries, 1000);
        let connection_str = format!("SSH connection to {}", config.connection_string());
        let session = retry_with_backoff(
            &retry_config,
            || Self::connect_once(&config, &password),
            &connection_str,
        )
        .map_err(|e| {
            Error::Connection(diagnose_ssh_error(
                &e,
                &config.host,
                config.port,
                &config.user,
            ))
        })?;

        Ok(Self { config, session })
    }

    /// Attempts to establish an SSH connection once (without retry).
    fn connect_once(config: &HostConfig, password: &str) -> Result<Session> {
        let addr_str = format!("{}:{}", config.host, config.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| {
                Error::Connection(format!("Failed to resolve host '{}': {}", config.host, e))
            })?
            .next()
            .ok_or_else(|| {
                Error::Connection(format!("No addresses found for host '{}'", config.host))
            })?;

        let timeout = Duration::from_secs(config.timeout);
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            Error::Connection(format!("Failed to connect to {}: {}", config.host, e))
        })?;

        let mut sess = Session::new()
            .map_err(|e| Error::Connection(format!("Failed to create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(config.timeout.saturating_mul(1000).min(u32::MAX as u64) as u32);
        sess.handshake()
            .map_err(|e| Error::Connection(format!("SSH handshake failed: {}", e)))?;

        debug!("Authenticating as user: {}", config.user);
        sess.userauth_password(&config.user, password)
            .map_err(|e| Error::Connection(format!("Password authentication failed: {}", e)))?;

        if !sess.authenticated() {
            return Err(Error::Connection(format!(
                "SSH authentication failed for user {}",
                config.user
            )));
        }

        // Hung DCL commands block forever; only the connect phase is bounded.
        sess.set_timeout(0);
        Ok(sess)
    }

    fn sftp(&self) -> Result<ssh2::Sftp> {
        self.session
            .sftp()
            .map_err(|e| Error::Transfer(format!("Failed to start SFTP subsystem: {}", e)))
    }

    fn upload_file(&self, sftp: &ssh2::Sftp, data: &[u8], remote: &str) -> Result<u64> {
        let mut file = sftp
            .create(Path::new(remote))
            .map_err(|e| Error::Transfer(format!("Failed to create {}: {}", remote, e)))?;
        file.write_all(data)
            .map_err(|e| Error::Transfer(format!("Failed to write {}: {}", remote, e)))?;
        Ok(data.len() as u64)
    }
}

impl RemoteSession for SshSession {
    fn host(&self) -> &str {
        &self.config.host
    }

    fn user(&self) -> &str {
        &self.config.user
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::Password
    }

    fn execute(&self, command: &str, options: &ExecOptions) -> Result<RawOutput> {
        debug!("Executing remote command: {}", command);

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| Error::Connection(format!("Failed to open channel: {}", e)))?;

        let command_line = if options.use_shell {
            format!("/bin/sh -c '{}'", command.replace('\'', r"'\''"))
        } else {
            command.to_string()
        };
        channel
            .exec(&command_line)
            .map_err(|e| Error::Connection(format!("Failed to execute command: {}", e)))?;

        let stdout = read_stream(&mut channel, "stdout")?;
        let stderr = read_stream(channel.stderr(), "stderr")?;

        channel
            .wait_close()
            .map_err(|e| Error::Connection(format!("Failed to close channel: {}", e)))?;

        let return_code = if options.force_success_return_code {
            None
        } else {
            channel.exit_status().ok()
        };

        if !options.suppress_output {
            debug!("Command stdout: {}", stdout);
            if !stderr.is_empty() {
                debug!("Command stderr: {}", stderr);
            }
        }

        Ok(RawOutput {
            stdout,
            stderr,
            return_code,
        })
    }

    fn upload(
        &self,
        source: &TransferSource,
        remote_name: &str,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        let sftp = self.sftp()?;
        let directory = options.working_directory.as_deref();
        let mut result = TransferResult {
            remote_paths: Vec::new(),
            bytes_transferred: 0,
        };

        match source {
            TransferSource::Buffer(bytes) => {
                let remote = join_remote(directory, remote_name);
                result.bytes_transferred = self.upload_file(&sftp, bytes, &remote)?;
                result.remote_paths.push(remote);
            }
            TransferSource::Path(path) => {
                let sources = if options.use_glob {
                    expand_glob(path)?
                } else {
                    vec![path.clone()]
                };
                if sources.is_empty() {
                    return Err(Error::Transfer(format!(
                        "No local files match {}",
                        path.display()
                    )));
                }
                // Several matches keep their own names; the remote name is then
                // ignored, the same way a directory destination would be.
                let multiple = sources.len() > 1;
                for local in sources {
                    let data = fs::read(&local)?;
                    let name = if multiple {
                        local
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| remote_name.to_string())
                    } else {
                        remote_name.to_string()
                    };
                    let remote = join_remote(directory, &name);
                    debug!("Uploading {} to {}", local.display(), remote);
                    result.bytes_transferred += self.upload_file(&sftp, &data, &remote)?;
                    result.remote_paths.push(remote);
                }
            }
        }

        Ok(result)
    }

    fn download(
        &self,
        remote_name: &str,
        target: &mut LocalTarget<'_>,
        options: &TransferOptions,
    ) -> Result<TransferResult> {
        let sftp = self.sftp()?;
        let remote = join_remote(options.working_directory.as_deref(), remote_name);
        debug!("Downloading {}", remote);

        let mut file = sftp
            .open(Path::new(&remote))
            .map_err(|e| Error::Transfer(format!("Failed to open {}: {}", remote, e)))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::Transfer(format!("Failed to read {}: {}", remote, e)))?;

        let bytes_transferred = data.len() as u64;
        match target {
            LocalTarget::Path(path) => {
                let path = if path.is_dir() {
                    path.join(remote_name)
                } else {
                    path.clone()
                };
                fs::write(&path, &data)?;
            }
            LocalTarget::Buffer(buffer) => buffer.extend_from_slice(&data),
        }

        Ok(TransferResult {
            remote_paths: vec![remote],
            bytes_transferred,
        })
    }

    fn exists(&self, remote_path: &str) -> Result<bool> {
        let sftp = self.sftp()?;
        Ok(sftp.stat(Path::new(remote_path)).is_ok())
    }
}

/// Reads a channel stream to the end.
///
/// OpenVMS text is frequently DEC MCS / ISO-8859-1, so bytes that are not
/// UTF-8 are replaced rather than failing the command. A read that breaks
/// off is a `Connection` error.
fn read_stream(mut stream: impl Read, what: &str) -> Result<String> {
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|e| Error::Connection(format!("Failed to read command {}: {}", what, e)))?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Expands `*` and `?` in the file-name component of `pattern`.
///
/// A pattern without wildcards is returned as-is, whether or not it exists.
pub fn expand_glob(pattern: &Path) -> Result<Vec<PathBuf>> {
    let name = match pattern.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => return Ok(vec![pattern.to_path_buf()]),
    };
    if !name.contains(['*', '?']) {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let dir = match pattern.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut matches = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let candidate = entry.file_name().to_string_lossy().to_string();
        if entry.file_type()?.is_file() && wildcard_match(&name, &candidate) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
