// redraft CLI entry point.

use std::process;

use clap::Parser;

mod commands;
mod exit_code;
mod output;
mod workspace;

use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "redraft", about = "Versioned documents edited with SEARCH/REPLACE patches")]
struct Cli {
    #[command(flatten)]
    globals: workspace::GlobalArgs,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(&cli.globals, cli.command) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(OutputFormat::detect(cli.globals.json), &error);
            ExitCode::from_error(&error).into()
        }
    }
}
