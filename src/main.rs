use clap::Parser;
use weekpool::cli::commands::{Cli, Commands};
use weekpool::cli::handlers;

fn main() {
    let cli = Cli::parse();

    // Init is handled before workspace discovery
    let result = if matches!(cli.command, Commands::Init) {
        handlers::cmd_init(&cli)
    } else {
        handlers::dispatch(cli)
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(handlers::exit_code(e.as_ref()));
    }
}
