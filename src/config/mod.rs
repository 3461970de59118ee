//! Site configuration management for `syllabus.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[site]`      | Site metadata                                    |
//! | `[build]`     | Pages, output, public and partial directories    |
//! | `[templates]` | Engine compile/runtime options, reload tracking  |
//! | `[context]`   | Static values handed to every page template      |
//! | `[serve]`     | Development server (port, interface, watch)      |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "CS 101"
//!
//! [build]
//! output = "dist"
//! partials = "src/partials"
//!
//! [context]
//! course = "CS 101"
//! instructor = "R. Ada"
//! ```

mod build;
mod defaults;
mod error;
mod serve;
mod templates;

pub use templates::{CompileOptions, RuntimeOptions};

use build::BuildConfig;
use error::ConfigError;
use serve::ServeConfig;
use templates::TemplatesConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// `[site]` section - basic site metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteInfo {
    /// Site title, printed when a build or the dev server starts.
    pub title: String,
}

/// Root configuration structure representing syllabus.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// True while running the development server
    #[serde(skip)]
    pub dev: bool,

    /// Basic site information
    #[serde(default)]
    pub site: SiteInfo,

    /// Directory layout
    #[serde(default)]
    pub build: BuildConfig,

    /// Template engine settings
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Static template context
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load, apply CLI overrides, normalize paths and validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        if !config_path.exists() {
            bail!("Config file not found: {}", config_path.display());
        }

        let mut config = Self::from_path(&config_path)?;
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        Self::update_option(&mut self.build.output, cli.output.as_ref());
        self.update_path_with_root(&root, &cli.config);

        self.dev = cli.is_serve();
        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every configured path against root as an absolute path
    fn update_path_with_root(&mut self, root: &Path, config_file: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(config_file));
        self.build.pages = Self::normalize_path(&root.join(&self.build.pages));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.build.public = Self::normalize_path(&root.join(&self.build.public));
        self.build.partials = self
            .build
            .partials
            .iter()
            .map(|dir| Self::normalize_path(&root.join(dir)))
            .collect();
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        crate::utils::category::normalize_path(path)
    }

    /// Path of the `version.json` polled by the site's update checker
    pub fn version_file(&self) -> PathBuf {
        self.build.public.join("version.json")
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        if !self.build.pages.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.pages] `{}` is not a directory",
                self.build.pages.display()
            )));
        }

        if self.build.output == self.build.pages {
            bail!(ConfigError::Validation(
                "[build.output] must differ from [build.pages]".into()
            ));
        }

        if self.build.partials.iter().any(|dir| *dir == self.build.output) {
            bail!(ConfigError::Validation(
                "[build.partials] must not contain the output directory".into()
            ));
        }

        if self.dev && self.serve.port == self.serve.reload_port {
            bail!(ConfigError::Validation(
                "[serve.port] and [serve.reload_port] must differ".into()
            ));
        }

        // Missing partial directories are not fatal: loading logs and skips them
        for dir in self.build.partials.iter().filter(|dir| !dir.is_dir()) {
            crate::log!("config"; "partial directory `{}` not found", dir.display());
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
