use clap::Parser;

use pairtaker::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Run(args) => cli::run(&cli, args).await?,
        Commands::Check(args) => cli::check(&cli, args).await?,
    }

    Ok(())
}
