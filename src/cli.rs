//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Handlebars page renderer and dev server for course websites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: syllabus.toml)
    #[arg(short = 'C', long, default_value = "syllabus.toml")]
    pub config: PathBuf,

    /// Print debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render every page into the output directory
    Build {
        /// Clean output directory completely before building
        #[arg(long)]
        clean: bool,
    },

    /// Serve pages with on-request rendering and live reload
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Bump the patch version in version.json
    Version,
}

impl Cli {
    pub const fn is_serve(&self) -> bool {
        matches!(self.command, Commands::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::parse_from(["syllabus", "serve", "--port", "8080", "--watch", "false"]);
        match &cli.command {
            Commands::Serve { port, watch, interface } => {
                assert_eq!(*port, Some(8080));
                assert_eq!(*watch, Some(false));
                assert!(interface.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli.is_serve());
    }

    #[test]
    fn test_parse_build_defaults() {
        let cli = Cli::parse_from(["syllabus", "-r", "site", "build"]);
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert_eq!(cli.config, PathBuf::from("syllabus.toml"));
        assert!(matches!(cli.command, Commands::Build { clean: false }));
        assert!(!cli.is_serve());
    }
}
