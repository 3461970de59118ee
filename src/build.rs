//! One-shot site build.
//!
//! ```text
//! build_site()
//!     │
//!     ├── prepare_output()       --clean removes the output directory
//!     ├── load_all_partials()    every configured partial directory
//!     ├── collect_pages()        *.html under pages, minus excluded dirs
//!     ├── render_page() ──► write <output>/<page>
//!     └── copy_public()          public/ copied to the output root
//! ```
//!
//! Render failures degrade to the page source and never fail the build;
//! I/O failures writing output do.

use crate::{
    config::SiteConfig,
    debug, log,
    render::{PageId, PageRenderer},
    utils::category::is_html,
};
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// Directory names never walked for pages.
const IGNORED_DIRS: &[&str] = &["node_modules"];

/// Summary of a finished build.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    /// Pages written as their unrendered source
    pub failed: usize,
    pub public_files: usize,
}

/// Render every page into the output directory and copy public files.
pub fn build_site(config: &SiteConfig, clean: bool) -> Result<BuildReport> {
    let output = &config.build.output;
    if !config.site.title.is_empty() {
        log!("build"; "{}", config.site.title);
    }
    prepare_output(output, clean)?;

    let mut renderer = PageRenderer::for_site(config);
    let partials = renderer.load_all_partials(&config.build.partials);
    log!("partials"; "loaded {partials} partials");

    let mut report = BuildReport::default();
    for source_path in collect_pages(config) {
        let Some(page) = PageId::from_source(&source_path, &config.build.pages) else {
            continue;
        };
        let source = fs::read_to_string(&source_path)
            .with_context(|| format!("Failed to read {}", source_path.display()))?;

        let outcome = renderer.render_page(&page, &source, Some(&source_path));
        if !outcome.is_rendered() {
            report.failed += 1;
        }
        write_file(&output.join(page.as_str()), outcome.into_html().as_bytes())?;
        debug!("build"; "{page}");
        report.pages += 1;
    }

    report.public_files = copy_public(&config.build.public, output)?;

    if report.failed > 0 {
        log!("warn"; "{} pages written unrendered", report.failed);
    }
    log!(
        "build";
        "{} pages, {} public files → {}",
        report.pages,
        report.public_files,
        output.display()
    );
    Ok(report)
}

/// Create the output directory, clearing it first when `clean` is set.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output)
            .with_context(|| format!("Failed to clear output directory: {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

/// Whether a walked entry under the pages root must be skipped.
fn is_excluded(entry: &DirEntry, config: &SiteConfig) -> bool {
    // the root itself is always walked, even when hidden (e.g. `.` or a tempdir)
    if entry.depth() == 0 {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }

    let path = entry.path();
    IGNORED_DIRS.contains(&name.as_ref())
        || path == config.build.output
        || path == config.build.public
        || config.build.partials.iter().any(|dir| path == dir)
}

/// Collect page sources (`*.html`) under the pages root, sorted.
fn collect_pages(config: &SiteConfig) -> Vec<PathBuf> {
    WalkDir::new(&config.build.pages)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e, config))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_html(e.path()))
        .map(DirEntry::into_path)
        .collect()
}

/// Copy the public directory verbatim into the output root.
fn copy_public(public: &Path, output: &Path) -> Result<usize> {
    if !public.is_dir() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in WalkDir::new(public).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(public)?;
        let content = fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        write_file(&output.join(rel), &content)?;
        count += 1;
    }
    Ok(count)
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let files = [
            ("index.html", "<body>{{> header}}<p>{{page}}</p></body>"),
            ("weeks/one.html", "{{> header}}week one"),
            ("broken.html", "{{#if}}"),
            ("main.js", "console.log(1)"),
            ("src/partials/header.hbs", "<h1>{{course}}</h1>"),
            ("public/version.json", r#"{"version":"1.0.0"}"#),
            ("public/icons/icon.svg", "<svg/>"),
            (".cache/stale.html", "hidden"),
            ("node_modules/pkg/readme.html", "dependency"),
        ];
        for (path, content) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        let mut config = SiteConfig::default();
        config.build.pages = root.clone();
        config.build.output = root.join("dist");
        config.build.public = root.join("public");
        config.build.partials = vec![root.join("src/partials")];
        config.context.insert("course".into(), "CS 101".into());
        (dir, config)
    }

    fn read(config: &SiteConfig, rel: &str) -> String {
        fs::read_to_string(config.build.output.join(rel)).unwrap()
    }

    #[test]
    fn test_build_renders_pages() {
        let (_dir, config) = site();
        let report = build_site(&config, false).unwrap();

        assert_eq!(report, BuildReport { pages: 3, failed: 1, public_files: 2 });
        assert_eq!(read(&config, "index.html"), "<body><h1>CS 101</h1><p>index.html</p></body>");
        assert_eq!(read(&config, "weeks/one.html"), "<h1>CS 101</h1>week one");
        assert_eq!(read(&config, "broken.html"), "{{#if}}");
    }

    #[test]
    fn test_build_copies_public_and_skips_rest() {
        let (_dir, config) = site();
        build_site(&config, false).unwrap();
        let output = &config.build.output;

        assert_eq!(read(&config, "version.json"), r#"{"version":"1.0.0"}"#);
        assert!(output.join("icons/icon.svg").is_file());
        assert!(!output.join("main.js").exists());
        assert!(!output.join("src").exists());
        assert!(!output.join(".cache").exists());
        assert!(!output.join("node_modules").exists());
    }

    #[test]
    fn test_rebuild_skips_output_dir() {
        let (_dir, config) = site();
        build_site(&config, false).unwrap();
        let report = build_site(&config, false).unwrap();

        assert_eq!(report.pages, 3);
        assert!(!config.build.output.join("dist").exists());
    }

    #[test]
    fn test_clean_removes_stale_output() {
        let (_dir, config) = site();
        let stale = config.build.output.join("old.html");
        write_file(&stale, b"old").unwrap();

        build_site(&config, false).unwrap();
        assert!(stale.exists());

        build_site(&config, true).unwrap();
        assert!(!stale.exists());
    }
}
