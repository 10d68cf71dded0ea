use clap::Parser;
use agenda_assistant::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Ask { query } => cli::ask::run(&query.join(" ")).await,
        Command::Chat => cli::chat::run().await,
        Command::Warm(args) => cli::warm::run(args).await,
        Command::Cache { command } => cli::cache::run(command).await,
    }
}
