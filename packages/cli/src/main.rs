use clap::Parser;

mod cli;
mod commands;
mod logging;

use crate::cli::Cli;
use crate::logging::{init_logging, LogConfig};

fn main() {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_flags(cli.verbose, cli.quiet));

    match commands::run(cli) {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
