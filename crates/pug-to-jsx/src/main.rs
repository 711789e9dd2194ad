//! pug-to-jsx: Convert Pug templates into JSX components.

mod cli;
mod config;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::Result;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.default_log_filter()))
        .format_timestamp(None)
        .init();

    let summary = orchestrator::run(args)?;
    if summary.should_fail() {
        std::process::exit(1);
    }
    Ok(())
}
