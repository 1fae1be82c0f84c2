use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = recipe_lib::Args::parse();
    recipe_lib::run(args)
}
