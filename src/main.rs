use clap::Parser;
use std::process;
use survey_tidy::cli::{self, Args};

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    if let Err(error) = cli::setup_logging(&args) {
        eprintln!("Failed to initialise logging: {:#}", error);
    }

    match cli::run(args) {
        Ok(_stats) => {
            // Row failures are reported in the summary, not through the exit code
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
