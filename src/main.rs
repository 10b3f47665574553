mod app;
mod config;
mod error;
mod field;
mod input;
mod palette;
mod render;
mod view;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    app::run(config::Args::parse())
}
