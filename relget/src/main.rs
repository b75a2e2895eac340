mod cli;
mod commands;
mod ui;

use clap::Parser;
use cli::Cli;
use relget_lib::logging::initialize_logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logging(cli.global_args.verbose);
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            cli::exit_code_for(&e)
        }
    }
}
