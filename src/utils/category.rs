//! File category classification for watch mode and the build walk.
//!
//! | Category | On change                                  | Example              |
//! |----------|--------------------------------------------|----------------------|
//! | Partial  | Re-register, reload pages that reference it | `src/partials/*.hbs` |
//! | Page     | Recompile on next request, reload the page | `weeks/one.html`     |
//! | Public   | Reload every open page                     | `public/version.json`|
//! | Config   | Ignored while serving (restart required)   | `syllabus.toml`      |
//! | Unknown  | Ignored                                    | `dist/*`, `.DS_Store`|

use crate::config::SiteConfig;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Extensions that mark a file inside a partial directory as a partial.
pub const PARTIAL_EXTENSIONS: &[&str] = &["hbs", "html"];

/// Category of a changed file, used to route watch events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    /// File under one of the partial directories
    Partial,
    /// Page template (`*.html`) under the pages root
    Page,
    /// File under the public directory
    Public,
    /// Site configuration (syllabus.toml)
    Config,
    /// Anything else, including the output directory
    Unknown,
}

impl FileCategory {
    /// Get the short name for this category (used in logs)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Partial => "partials",
            Self::Page => "pages",
            Self::Public => "public",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }
}

/// Categorize a file path to decide how a change is handled.
///
/// Order matters: partial and public directories usually live under the
/// pages root, and the output directory must never count as a page.
pub fn categorize_path(path: &Path, config: &SiteConfig) -> FileCategory {
    let path = normalize_path(path);
    let build = &config.build;

    if path == config.config_path {
        FileCategory::Config
    } else if path.starts_with(&build.output) {
        FileCategory::Unknown
    } else if build.partials.iter().any(|dir| path.starts_with(dir)) {
        FileCategory::Partial
    } else if path.starts_with(&build.public) {
        FileCategory::Public
    } else if path.starts_with(&build.pages) && is_html(&path) {
        FileCategory::Page
    } else {
        FileCategory::Unknown
    }
}

/// Check whether a path has an `.html` extension.
pub fn is_html(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}

/// Check whether a file name marks a partial (`*.hbs`, `*.html`).
pub fn is_partial_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PARTIAL_EXTENSIONS.contains(&ext))
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Config paths are already canonicalized, so we need to canonicalize
/// incoming paths (e.g., from file watcher) before comparison.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.config_path = root.join("syllabus.toml");
        config.build.pages = root.to_path_buf();
        config.build.output = root.join("dist");
        config.build.public = root.join("public");
        config.build.partials = vec![root.join("src/partials")];
        config
    }

    #[test]
    fn test_categorize_path() {
        let root = Path::new("/site");
        let config = config_at(root);

        assert_eq!(
            categorize_path(&root.join("src/partials/nav.hbs"), &config),
            FileCategory::Partial
        );
        assert_eq!(
            categorize_path(&root.join("weeks/one.html"), &config),
            FileCategory::Page
        );
        assert_eq!(
            categorize_path(&root.join("public/version.json"), &config),
            FileCategory::Public
        );
        assert_eq!(
            categorize_path(&root.join("syllabus.toml"), &config),
            FileCategory::Config
        );
    }

    #[test]
    fn test_output_is_never_a_page() {
        let root = Path::new("/site");
        let config = config_at(root);

        assert_eq!(
            categorize_path(&root.join("dist/index.html"), &config),
            FileCategory::Unknown
        );
        assert_eq!(
            categorize_path(&root.join("src/main.ts"), &config),
            FileCategory::Unknown
        );
        assert_eq!(categorize_path(Path::new("/elsewhere/a.html"), &config), FileCategory::Unknown);
    }

    #[test]
    fn test_is_partial_file() {
        assert!(is_partial_file(Path::new("nav.hbs")));
        assert!(is_partial_file(Path::new("footer.html")));
        assert!(!is_partial_file(Path::new("notes.md")));
        assert!(!is_partial_file(Path::new("README")));
    }

    #[test]
    fn test_normalize_path_absolute_missing() {
        let path = Path::new("/definitely/not/here.html");
        assert_eq!(normalize_path(path), path);
    }
}
