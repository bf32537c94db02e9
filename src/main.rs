use anyhow::Result;
use clap::Parser;

use webext_api_finder::driver::cli::{Cli, Commands};
use webext_api_finder::driver::{pipeline, stub_filters};

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run_main().await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run_main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Filter(args) => pipeline::run_filter(args).await,
        Commands::Permissions(args) => stub_filters::run_permissions(args),
        Commands::Manifest(args) => stub_filters::run_manifest(args),
        Commands::UserCount(args) => stub_filters::run_user_count(args),
    }
}
