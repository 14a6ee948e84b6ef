use clap::Parser;
use gridplan::cli::commands::Cli;
use gridplan::cli::handlers;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = gridplan::logging::init_logging() {
        eprintln!("warning: logging disabled: {}", e);
    }

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
