use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli;

use cli::cluster::{ClusterNodesCommand, ClusterwideCommand, LsofCommand, ShadowsetCommand};
use cli::completions::CompletionsCommand;
use cli::config::ConfigCommand;
use cli::queue::QueueCommand;
use cli::run::{LocalCommand, RunCommand, SafeRunCommand};
use cli::script::ScriptCommand;
use cli::transfer::{CatCommand, ExistsCommand, GetCommand, PutCommand};

#[derive(Parser)]
#[command(name = "vmsfab")]
#[command(about = "Run commands, transfer files and manage batch jobs on OpenVMS hosts over SSH", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(RunCommand),
    SafeRun(SafeRunCommand),
    Local(LocalCommand),
    Put(PutCommand),
    Get(GetCommand),
    Cat(CatCommand),
    Exists(ExistsCommand),
    Script(ScriptCommand),
    Clusterwide(ClusterwideCommand),
    ClusterNodes(ClusterNodesCommand),
    Shadowset(ShadowsetCommand),
    Lsof(LsofCommand),
    Queue(QueueCommand),
    Config(ConfigCommand),
    Completions(CompletionsCommand),
}

fn main() -> Result<()> {
    // Command output is echoed by the executor; keep the log quiet by default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(cmd) => cmd.execute(),
        Commands::SafeRun(cmd) => cmd.execute(),
        Commands::Local(cmd) => cmd.execute(),
        Commands::Put(cmd) => cmd.execute(),
        Commands::Get(cmd) => cmd.execute(),
        Commands::Cat(cmd) => cmd.execute(),
        Commands::Exists(cmd) => cmd.execute(),
        Commands::Script(cmd) => cmd.execute(),
        Commands::Clusterwide(cmd) => cmd.execute(),
        Commands::ClusterNodes(cmd) => cmd.execute(),
        Commands::Shadowset(cmd) => cmd.execute(),
        Commands::Lsof(cmd) => cmd.execute(),
        Commands::Queue(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute(),
        Commands::Completions(cmd) => cmd.execute(),
    }
}
