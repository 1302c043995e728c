//! Cluster membership, shadow sets and SYSMAN fan-out.
//!
//! Cluster-wide commands are not run node by node: one SYSMAN script that
//! selects each node in turn is uploaded and executed once, and SYSMAN does
//! the fan-out.

use crate::error::{Error, Result};
use crate::remote::session::RemoteSession;
use crate::vms::executor::{pretty_print, ExecutionResult, VmsExecutor};
use crate::vms::script::ScriptRunner;
use log::{debug, warn};

/// Prefix that feeds a script to SYSMAN.
pub const SYSMAN_PREFIX: &str = "MCR SYSMAN";

/// Shadow set queried when none is given.
pub const DEFAULT_SHADOW_SET: &str = "DSA0:";

/// One or more DCL commands; a single command is a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandList(pub Vec<String>);

impl From<&str> for CommandList {
    fn from(command: &str) -> Self {
        CommandList(vec![command.to_string()])
    }
}

impl From<String> for CommandList {
    fn from(command: String) -> Self {
        CommandList(vec![command])
    }
}

impl From<Vec<String>> for CommandList {
    fn from(commands: Vec<String>) -> Self {
        CommandList(commands)
    }
}

impl From<Vec<&str>> for CommandList {
    fn from(commands: Vec<&str>) -> Self {
        CommandList(commands.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CommandList {
    fn from(commands: &[&str]) -> Self {
        CommandList(commands.iter().map(|c| c.to_string()).collect())
    }
}

/// Node names of `SHOW CLUSTER` rows whose status column says `MEMBER`.
pub fn parse_cluster_nodes(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.contains("MEMBER "))
        .filter_map(|line| line.split('|').nth(1))
        .map(|node| node.trim().to_string())
        .filter(|node| !node.is_empty())
        .collect()
}

/// First column of each non-blank line of a device listing.
pub fn parse_shadow_set_members(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// SYSMAN input that runs every command on every node, then exits.
pub fn build_sysman_script(nodes: &[String], commands: &[String]) -> String {
    let mut script = String::new();
    for node in nodes {
        script.push_str(&format!("SET ENVIRONMENT /NODE=({})\n", node));
        for command in commands {
            script.push_str(&format!("DO {}\n", command));
        }
    }
    script.push_str("EXIT\n");
    script
}

/// Cluster-level queries and commands.
pub struct Cluster<'a, S> {
    exec: &'a VmsExecutor<S>,
}

impl<'a, S: RemoteSession> Cluster<'a, S> {
    pub fn new(exec: &'a VmsExecutor<S>) -> Self {
        Self { exec }
    }

    /// Names of the nodes that are currently cluster members.
    ///
    /// # Errors
    ///
    /// `Error::Parse` if `SHOW CLUSTER` itself fails, e.g. without privilege.
    pub fn nodes(&self) -> Result<Vec<String>> {
        let result = self.exec.run_quiet("SHOW CLUSTER")?;
        if result.failed() {
            return Err(Error::Parse(format!(
                "SHOW CLUSTER failed ({}): {}",
                result.severity,
                result.stdout_text()
            )));
        }
        let nodes = parse_cluster_nodes(&result.stdout);
        debug!("Cluster members: {:?}", nodes);
        Ok(nodes)
    }

    /// Physical devices backing `shadow_set` (e.g. `DSA0:`).
    pub fn shadow_set_members(&self, shadow_set: &str) -> Result<Vec<String>> {
        let result = self.exec.run(&format!(
            "SHOW DEVICE {} /BRIEF | SEA SYS$PIPE ShadowSetMember",
            shadow_set
        ))?;
        Ok(parse_shadow_set_members(&result.stdout))
    }

    /// Runs `commands` on every cluster member through SYSMAN.
    ///
    /// # Errors
    ///
    /// `Error::Parse` when no cluster member can be found; nothing is
    /// uploaded then.
    pub fn run_clusterwide(
        &self,
        commands: impl Into<CommandList>,
        show_running: bool,
    ) -> Result<ExecutionResult> {
        let CommandList(commands) = commands.into();

        if show_running && self.exec.echo() {
            for command in &commands {
                pretty_print(
                    self.exec.host(),
                    Some(&format!("Running clusterwide: {}", command)),
                    &[],
                );
            }
        }

        let nodes = self.nodes()?;
        if nodes.is_empty() {
            warn!("No cluster members found on {}", self.exec.host());
            return Err(Error::Parse(format!(
                "SHOW CLUSTER on {} lists no members",
                self.exec.host()
            )));
        }

        let script = build_sysman_script(&nodes, &commands);
        self.run_script_clusterwide(script.into_bytes())
    }

    /// Feeds an existing SYSMAN script to `MCR SYSMAN`.
    pub fn run_script_clusterwide(
        &self,
        script: impl Into<crate::remote::session::TransferSource>,
    ) -> Result<ExecutionResult> {
        ScriptRunner::new(self.exec).run_script(script, Some(SYSMAN_PREFIX))
    }
}
