//! wasmloop binary entry point: argument parsing, logging setup and command
//! dispatch.

use clap::Parser;
use miette::Result;
use wasmloop_cli::{cli, commands, error, logger, ui};

// Sockets, the optimizer subprocess and timers are all async; nothing here
// needs more than one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let color = !args.no_color && ui::should_use_color();
    logger::init_logger(args.verbose, args.quiet, !color);
    ui::init_colors(color);

    let result = match args.command {
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
        cli::Command::Check(check_args) => commands::check_execute(check_args).await,
    };

    result.map_err(error::cli_error_to_miette)
}
