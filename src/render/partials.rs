//! Partial discovery and reference scanning.
//!
//! References are found with a fixed textual pattern, `{{> name }}`, not by
//! asking the engine. Block partials (`{{#> layout}}`), partials with
//! arguments (`{{> card title="x"}}`) and dynamic names
//! (`{{> (lookup . "p")}}`) are not seen, so pages using only those forms
//! are not reloaded when the partial changes.

use crate::utils::category::is_partial_file;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

static PARTIAL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{>\s*([a-zA-Z0-9_-]+)\s*\}\}").unwrap());

/// Partial name for a file: its base name without extension.
///
/// `src/partials/site-nav.hbs` → `site-nav`
pub fn partial_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
}

/// Collect the distinct partial names referenced by a page source.
pub fn extract_references(source: &str) -> FxHashSet<String> {
    PARTIAL_REFERENCE
        .captures_iter(source)
        .map(|caps| caps[1].to_owned())
        .collect()
}

/// List partial files directly inside `dir` (no recursion), sorted by path.
pub fn list_partial_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_partial_file(path))
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_name() {
        assert_eq!(partial_name(Path::new("/p/nav.hbs")).as_deref(), Some("nav"));
        assert_eq!(partial_name(Path::new("footer.html")).as_deref(), Some("footer"));
        assert_eq!(partial_name(Path::new("week.card.hbs")).as_deref(), Some("week.card"));
    }

    #[test]
    fn test_extract_references_is_a_set() {
        let source = "{{> nav}}<main>{{>footer }}</main>{{>   nav   }}";
        let refs = extract_references(source);

        assert_eq!(refs.len(), 2);
        assert!(refs.contains("nav"));
        assert!(refs.contains("footer"));
    }

    #[test]
    fn test_extract_references_ignores_other_forms() {
        let source = r#"{{#> layout}}x{{/layout}} {{> card title="x"}} {{> (lookup . "p")}} {{title}}"#;
        assert!(extract_references(source).is_empty());
    }

    #[test]
    fn test_extract_references_names() {
        let refs = extract_references("{{> week_1}}{{> site-header}}");
        assert!(refs.contains("week_1"));
        assert!(refs.contains("site-header"));
    }

    #[test]
    fn test_list_partial_files_non_recursive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.hbs"), "A").unwrap();
        fs::write(dir.path().join("b.html"), "B").unwrap();
        fs::write(dir.path().join("notes.md"), "skip").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.hbs"), "C").unwrap();

        let files = list_partial_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().filter_map(|p| partial_name(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_list_partial_files_missing_dir() {
        assert!(list_partial_files(Path::new("/no/such/partials")).is_err());
    }
}
