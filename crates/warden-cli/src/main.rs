mod bootstrap_helpers;
mod cli_args;
mod pipeline_config;
mod prepare_command;
mod run_output;
mod sanitize_output_command;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{Cli, WardenCommand};
use crate::pipeline_config::PipelineConfig;
use crate::prepare_command::run_prepare;
use crate::sanitize_output_command::run_sanitize_output;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}

async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        WardenCommand::Prepare(args) => {
            let config = PipelineConfig::from_args(&args)?;
            run_prepare(config).await
        }
        WardenCommand::SanitizeOutput(args) => run_sanitize_output(&args),
    }
}
