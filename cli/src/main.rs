use anyhow::Result;
use clap::Parser;
use env_logger::Env;

mod config;
mod docqa_cmd;
mod history_cmd;

use docqa_cmd::DocqaCli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DocqaCli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    cli.run().await
}
