//! qanary-gerbil: benchmark adapter between GERBIL QA and a Qanary pipeline.
//!
//! Generates GERBIL endpoint URLs for a component selection and answers
//! GERBIL's execution requests by running the pipeline and reading its
//! results back from the triple store.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
