//! CLI command for managing vmsfab configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use vmsfab::config::{Config, HostConfig, DEFAULT_TEMP_DIR};
use vmsfab::remote::{RemoteSession, SshSession};
use vmsfab::vms::{SessionContext, VmsExecutor};

#[derive(Args)]
#[command(about = "Manage vmsfab configuration")]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show the configuration file path
    Path,

    /// List all configured hosts
    ListHosts,

    /// Add or update a host
    AddHost {
        /// Short name for the host (e.g., "alpha1")
        name: String,

        /// Hostname or IP address
        #[arg(long)]
        host: String,

        /// OpenVMS username
        #[arg(long)]
        user: String,

        /// SSH port
        #[arg(long, default_value = "22")]
        port: u16,

        /// Directory or logical name for temporary files
        #[arg(long, default_value = DEFAULT_TEMP_DIR)]
        temp_dir: String,

        /// Force this terminal width before every command
        #[arg(long)]
        terminal_width: Option<u16>,

        /// Connection timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Make this the default host
        #[arg(long)]
        default: bool,
    },

    /// Remove a host
    RemoveHost {
        /// Name of the host to remove
        name: String,
    },

    /// Show details of a specific host
    ShowHost {
        /// Name of the host to show
        name: String,
    },

    /// Initialize a new configuration file with an example host
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Log in to configured hosts and run SHOW TIME
    Validate {
        /// Specific host to validate (validates all if not specified)
        name: Option<String>,
    },
}

impl ConfigCommand {
    pub fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show => self.show_config(),
            ConfigAction::Path => self.show_path(),
            ConfigAction::ListHosts => self.list_hosts(),
            ConfigAction::AddHost {
                name,
                host,
                user,
                port,
                temp_dir,
                terminal_width,
                timeout,
                default,
            } => {
                let mut config = HostConfig::new(host.clone(), user.clone())
                    .with_port(*port)
                    .with_temp_dir(temp_dir.clone())
                    .with_timeout(*timeout);
                if let Some(width) = terminal_width {
                    config = config.with_terminal_width(*width);
                }
                self.add_host(name, config, *default)
            }
            ConfigAction::RemoveHost { name } => self.remove_host(name),
            ConfigAction::ShowHost { name } => self.show_host(name),
            ConfigAction::Init { force } => self.init_config(*force),
            ConfigAction::Validate { name } => self.validate_hosts(name.as_deref()),
        }
    }

    fn show_config(&self) -> Result<()> {
        let config = Config::load()?;

        if config.hosts.is_empty() {
            println!("No configuration file found or no hosts configured.");
            println!();
            println!("To create a configuration file, run:");
            println!("  vmsfab config init");
            return Ok(());
        }

        let yaml = serde_yaml::to_string(&config)?;
        println!("{}", yaml);

        Ok(())
    }

    fn show_path(&self) -> Result<()> {
        match Config::default_path() {
            Some(path) => {
                println!("Configuration file path: {}", path.display());
                if path.exists() {
                    println!("Status: File exists");
                } else {
                    println!("Status: File does not exist");
                }
            }
            None => {
                println!("Could not determine configuration directory");
            }
        }

        Ok(())
    }

    fn list_hosts(&self) -> Result<()> {
        let config = Config::load()?;

        if config.hosts.is_empty() {
            println!("No hosts configured.");
            return Ok(());
        }

        println!("Configured hosts:");
        println!();

        for name in config.host_names() {
            let host = &config.hosts[name];
            let marker = if config.defaults.host.as_deref() == Some(name.as_str()) {
                " (default)"
            } else {
                ""
            };
            println!("  {} - {}{}", name, host.connection_string(), marker);
        }

        Ok(())
    }

    fn add_host(&self, name: &str, host: HostConfig, make_default: bool) -> Result<()> {
        let mut config = Config::load()?;

        if config.get_host(name).is_some() {
            println!("Warning: Host '{}' already exists, updating...", name);
        }

        config.set_host(name.to_string(), host);
        if make_default || config.defaults.host.is_none() {
            config.defaults.host = Some(name.to_string());
        }
        config.save()?;

        println!("Added host '{}'", name);
        if let Some(path) = Config::default_path() {
            println!("Configuration saved to: {}", path.display());
        }

        Ok(())
    }

    fn remove_host(&self, name: &str) -> Result<()> {
        let mut config = Config::load()?;

        if config.remove_host(name).is_some() {
            if config.defaults.host.as_deref() == Some(name) {
                config.defaults.host = None;
            }
            config.save()?;
            println!("Removed host '{}'", name);
        } else {
            println!("Host '{}' not found", name);
        }

        Ok(())
    }

    fn show_host(&self, name: &str) -> Result<()> {
        let config = Config::load()?;

        match config.get_host(name) {
            Some(host) => {
                println!("Host: {}", name);
                println!("  Address: {}", host.host);
                println!("  User: {}", host.user);
                println!("  Port: {}", host.port);
                println!(
                    "  Password: {}",
                    if host.password.is_some() {
                        "(stored)"
                    } else {
                        "(from VMSFAB_PASSWORD or prompt)"
                    }
                );
                println!("  Temp directory: {}", host.temp_dir);
                match host.terminal_width {
                    Some(width) => println!("  Terminal width: {}", width),
                    None => println!("  Terminal width: (not forced)"),
                }
                println!("  Timeout: {}s", host.timeout);
                println!();
                println!("Connection string: {}", host.connection_string());
            }
            None => {
                println!("Host '{}' not found", name);
            }
        }

        Ok(())
    }

    fn init_config(&self, force: bool) -> Result<()> {
        let path = Config::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine configuration directory"))?;

        if path.exists() && !force {
            println!("Configuration file already exists at: {}", path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let mut config = Config::default();
        config.set_host(
            "alpha1".to_string(),
            HostConfig::new("alpha1.example.com".to_string(), "SYSTEM".to_string())
                .with_terminal_width(255),
        );
        config.defaults.host = Some("alpha1".to_string());
        config.save()?;

        println!("Created configuration file at: {}", path.display());
        println!();
        println!("An example host has been added. Edit the file to describe your systems:");
        println!("  vmsfab config show");
        println!();
        println!("Or add hosts via CLI:");
        println!("  vmsfab config add-host vax1 --host vax1.example.com --user SYSTEM");

        Ok(())
    }

    fn validate_hosts(&self, name: Option<&str>) -> Result<()> {
        let config = Config::load()?;

        let hosts: Vec<(String, HostConfig)> = match name {
            Some(n) => match config.get_host(n) {
                Some(host) => vec![(n.to_string(), host.clone())],
                None => {
                    println!("Host '{}' not found", n);
                    return Ok(());
                }
            },
            None => config
                .host_names()
                .into_iter()
                .map(|n| (n.clone(), config.hosts[n].clone()))
                .collect(),
        };

        if hosts.is_empty() {
            println!("No hosts configured to validate.");
            return Ok(());
        }

        println!("Validating {} host(s)...", hosts.len());
        println!();

        let mut success_count = 0;
        let mut failure_count = 0;

        for (host_name, host) in &hosts {
            print!("  {} ({})... ", host_name, host.connection_string());

            match Self::test_connection(host) {
                Ok(time) => {
                    println!("✓ {}", time);
                    success_count += 1;
                }
                Err(e) => {
                    println!("✗ {}", e);
                    failure_count += 1;
                }
            }
        }

        println!();
        println!(
            "Results: {} passed, {} failed",
            success_count, failure_count
        );

        Ok(())
    }

    fn test_connection(host: &HostConfig) -> Result<String> {
        let session: Box<dyn RemoteSession> = Box::new(SshSession::connect(host.clone())?);
        let exec =
            VmsExecutor::new(session, SessionContext::from_host_config(host)).with_echo(false);
        let result = exec.run("SHOW TIME")?;
        if result.failed() {
            anyhow::bail!("SHOW TIME failed with {}", result.severity);
        }
        Ok(result.stdout_text().trim().to_string())
    }
}
