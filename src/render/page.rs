//! Generated page identity.

use std::{fmt, path::Path};

/// Identity of one generated page: its output path relative to the site
/// root, always `/`-separated and without a leading slash.
///
/// `weeks/one.html` is served at `/weeks/one.html` and written to
/// `<output>/weeks/one.html`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    pub fn new(output_path: impl AsRef<str>) -> Self {
        let path = output_path.as_ref().replace('\\', "/");
        Self(path.trim_start_matches('/').to_owned())
    }

    /// Identity of a page source file located under `pages_root`.
    pub fn from_source(source: &Path, pages_root: &Path) -> Option<Self> {
        let rel = source.strip_prefix(pages_root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        (!parts.is_empty()).then(|| Self::new(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL path the browser sees for this page, used to address reloads.
    pub fn url_path(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
