use clap::Parser;
use orobt::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
