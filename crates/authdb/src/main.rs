use std::env;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr; stdout carries the diff and status lines
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let command_args = args.get(1..).unwrap_or_default().to_vec();

    if let Err(err) = authdb_cli::run(&command_args) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}
