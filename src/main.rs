use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use stonkie::cli::{run, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if let Err(e) = run(args).await {
        eprintln!("{} {e}", "Error:".red().bold());
        std::process::exit(1);
    }
}
