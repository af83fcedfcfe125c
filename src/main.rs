use clap::Parser;
use organize::cli::{Cli, run_cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    std::process::exit(run_cli(&cli));
}
