use std::process::ExitCode;

use clap::Parser;

fn main() -> anyhow::Result<ExitCode> {
    let cli = zge_assist::cli::Cli::parse();
    zge_assist::init(cli.verbose);

    zge_assist::cli::run(cli)
}
