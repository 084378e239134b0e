mod cli;
mod config;
mod console;
mod journal;
mod model;
mod persist;
mod reply;
mod report;
mod transport;
mod workflow;

use std::process;

use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
