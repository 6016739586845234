//! dbsetup: run the SQL migrations of a FiveM server for its framework.

use clap::Parser;
use dbsetup::{Cli, execute_cli};
use dbsetup_core::logging::init_logging;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; explicit flags and the process env still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let status = execute_cli(&cli).await;
    std::process::exit(status.exit_code());
}
