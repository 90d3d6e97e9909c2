use clap::Parser;
use pump_processor::cli::{Args, run, setup_logging};
use std::process;

fn main() {
    let args = Args::parse();

    if let Err(error) = setup_logging(&args) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }

    match run(&args) {
        Ok(_report) => {
            // Report has already been printed
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
