//! `[build]` section configuration.
//!
//! Contains the source, output and partial directory layout.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// `[build]` section in syllabus.toml - directory layout.
///
/// # Example
/// ```toml
/// [build]
/// pages = "."                 # Page sources (*.html)
/// output = "dist"             # Rendered site
/// public = "public"           # Copied verbatim to the output root
/// partials = ["src/partials", "src/blocks"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Directory holding the page templates.
    #[serde(default = "defaults::build::pages")]
    #[educe(Default = defaults::build::pages())]
    pub pages: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Static files copied as-is (icons, `version.json`, manifest).
    #[serde(default = "defaults::build::public")]
    #[educe(Default = defaults::build::public())]
    pub public: PathBuf,

    /// Partial directories, a single path or a list. Empty disables partials.
    #[serde(deserialize_with = "one_or_many")]
    pub partials: Vec<PathBuf>,
}

/// Accept either `partials = "dir"` or `partials = ["a", "b"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(PathBuf),
        Many(Vec<PathBuf>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(path) => vec![path],
        OneOrMany::Many(paths) => paths,
    })
}
