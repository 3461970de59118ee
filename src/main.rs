//! Syllabus - Handlebars page renderer and dev server for course websites.

mod build;
mod cli;
mod config;
mod logger;
mod reload;
mod render;
mod serve;
mod utils;
mod version;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use serve::serve_site;
use version::bump_version;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    // The server threads borrow the config for the life of the process
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(&cli)?));

    match &cli.command {
        Commands::Build { clean } => build_site(config, *clean).map(|_| ()),
        Commands::Serve { .. } => serve_site(config),
        Commands::Version => bump_version(config).map(|_| ()),
    }
}
