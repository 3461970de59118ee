//! File system watcher for live reload.
//!
//! Monitors the pages root, partial directories, public directory and config
//! file, then routes each debounced change by [`FileCategory`]:
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────────────────────────────────┐
//! │ notify   │───▶│ Debouncer│───▶│ handle_changes()                         │
//! │ events   │    │ (300ms)  │    │  Partial → on_partial_file_changed       │
//! └──────────┘    └──────────┘    │  Page    → forget_page + reload the page │
//!                                 │  Public  → reload every page             │
//!                                 │  Config  → restart required              │
//!                                 └──────────────────────────────────────────┘
//! ```

use crate::{
    config::SiteConfig,
    debug, log,
    reload::{ALL_PAGES, ReloadSink},
    render::{PageId, PageRenderer},
    utils::category::{FileCategory, categorize_path},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Format path relative to root for log display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events; editors often emit several per save.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Route a batch of changed paths. Returns the number of reloads requested.
fn handle_changes(
    paths: &[PathBuf],
    config: &SiteConfig,
    renderer: &Mutex<PageRenderer>,
    reload: &dyn ReloadSink,
) -> usize {
    let root = config.get_root();
    let mut reloads = 0;
    let mut public_changed = false;

    for path in paths {
        let category = categorize_path(path, config);
        debug!("watch"; "{} ({})", rel_path(path, root), category.name());

        match category {
            FileCategory::Partial => {
                let mut renderer = renderer.lock();
                let options = renderer.options();
                if !options.reload_on_partial_change || options.partial_dirs.is_empty() {
                    continue;
                }
                let affected = renderer.on_partial_file_changed(path, reload);
                if !affected.is_empty() {
                    log!("watch"; "{} changed, reloading {} pages", rel_path(path, root), affected.len());
                }
                reloads += affected.len();
            }
            FileCategory::Page => {
                let Some(page) = PageId::from_source(path, &config.build.pages) else {
                    continue;
                };
                renderer.lock().forget_page(&page);
                log!("watch"; "{page} changed");
                reload.full_reload(&page.url_path());
                reloads += 1;
            }
            FileCategory::Public => public_changed = true,
            FileCategory::Config => {
                log!("watch"; "{} changed, restart to apply", rel_path(path, root));
            }
            FileCategory::Unknown => {}
        }
    }

    if public_changed {
        log!("watch"; "public files changed, reloading all pages");
        reload.full_reload(ALL_PAGES);
        reloads += 1;
    }

    reloads
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Directories and files to watch, without entries already covered by a
/// recursive watch on an ancestor.
fn watch_targets(config: &SiteConfig) -> Vec<(PathBuf, RecursiveMode)> {
    let build = &config.build;
    let mut targets = vec![(build.pages.clone(), RecursiveMode::Recursive)];

    for dir in build.partials.iter().chain([&build.public]) {
        if dir.is_dir() && !dir.starts_with(&build.pages) {
            targets.push((dir.clone(), RecursiveMode::Recursive));
        }
    }
    if config.config_path.is_file() && !config.config_path.starts_with(&build.pages) {
        targets.push((config.config_path.clone(), RecursiveMode::NonRecursive));
    }

    targets
}

fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<()> {
    let root = config.get_root();

    for (path, mode) in watch_targets(config) {
        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        log!("watch"; "{}", rel_path(&path, root));
    }

    eprintln!(); // Blank line to separate init logs from change events
    Ok(())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Public API
// =============================================================================

/// Start blocking file watcher that invalidates cached pages and signals
/// reloads.
pub fn watch_for_changes_blocking(
    config: &SiteConfig,
    renderer: &Mutex<PageRenderer>,
    reload: &dyn ReloadSink,
) -> Result<()> {
    if !config.serve.watch {
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), config, renderer, reload);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ReloadSink for Recorder {
        fn full_reload(&self, path: &str) {
            self.0.lock().push(path.to_owned());
        }
    }

    struct Site {
        _dir: TempDir,
        config: SiteConfig,
    }

    fn site() -> Site {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        for sub in ["src/partials", "public", "weeks"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("syllabus.toml"), "").unwrap();

        let mut config = SiteConfig::default();
        config.config_path = root.join("syllabus.toml");
        config.build.pages = root.clone();
        config.build.output = root.join("dist");
        config.build.public = root.join("public");
        config.build.partials = vec![root.join("src/partials")];
        config.set_root(&root);
        Site { _dir: dir, config }
    }

    fn event(paths: &[&Path]) -> Event {
        let mut event = Event::new(EventKind::Create(notify::event::CreateKind::File));
        for path in paths {
            event = event.add_path(path.to_path_buf());
        }
        event
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("header.hbs~")));
        assert!(is_temp_file(Path::new(".header.hbs.swp")));
        assert!(is_temp_file(Path::new("index.html.bak")));
        assert!(!is_temp_file(Path::new("header.hbs")));
    }

    #[test]
    fn test_debouncer_filters_and_batches() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());

        debouncer.add(event(&[Path::new("/a.html"), Path::new("/a.html~")]));
        debouncer.add(event(&[Path::new("/a.html")]));
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));

        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), vec![PathBuf::from("/a.html")]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_partial_change_reloads_referencing_page() {
        let site = site();
        let partial = site.config.build.partials[0].join("header.hbs");
        fs::write(&partial, "v1").unwrap();

        let renderer = Mutex::new(PageRenderer::for_site(&site.config));
        {
            let mut r = renderer.lock();
            r.load_all_partials(&site.config.build.partials);
            let page = PageId::new("index.html");
            r.render_page(&page, "{{> header}}", Some(Path::new("index.html")));
        }

        fs::write(&partial, "v2").unwrap();
        let recorder = Recorder::default();
        let reloads = handle_changes(&[partial], &site.config, &renderer, &recorder);

        assert_eq!(reloads, 1);
        assert_eq!(*recorder.0.lock(), vec!["/index.html"]);
    }

    #[test]
    fn test_partial_change_ignored_when_tracking_disabled() {
        let mut site = site();
        site.config.templates.reload_on_partial_change = false;
        let partial = site.config.build.partials[0].join("header.hbs");
        fs::write(&partial, "v1").unwrap();

        let renderer = Mutex::new(PageRenderer::for_site(&site.config));
        let recorder = Recorder::default();

        assert_eq!(handle_changes(&[partial], &site.config, &renderer, &recorder), 0);
        assert_eq!(renderer.lock().partial("header"), None);
    }

    #[test]
    fn test_page_change_forgets_and_reloads() {
        let site = site();
        let source = site.config.build.pages.join("weeks/one.html");
        fs::write(&source, "<p>old</p>").unwrap();

        let renderer = Mutex::new(PageRenderer::for_site(&site.config));
        let page = PageId::new("weeks/one.html");
        renderer.lock().render_page(&page, "<p>old</p>", Some(&source));
        assert!(renderer.lock().is_cached(&page));

        let recorder = Recorder::default();
        handle_changes(&[source], &site.config, &renderer, &recorder);

        assert!(!renderer.lock().is_cached(&page));
        assert_eq!(*recorder.0.lock(), vec!["/weeks/one.html"]);
    }

    #[test]
    fn test_public_changes_reload_all_once() {
        let site = site();
        let a = site.config.build.public.join("version.json");
        let b = site.config.build.public.join("style.css");
        fs::write(&a, "{}").unwrap();
        fs::write(&b, "").unwrap();

        let renderer = Mutex::new(PageRenderer::for_site(&site.config));
        let recorder = Recorder::default();
        handle_changes(&[a, b], &site.config, &renderer, &recorder);

        assert_eq!(*recorder.0.lock(), vec![ALL_PAGES]);
    }

    #[test]
    fn test_config_and_output_changes_send_nothing() {
        let site = site();
        let output = site.config.build.output.join("index.html");

        let renderer = Mutex::new(PageRenderer::for_site(&site.config));
        let recorder = Recorder::default();
        let paths = [site.config.config_path.clone(), output];

        assert_eq!(handle_changes(&paths, &site.config, &renderer, &recorder), 0);
        assert!(recorder.0.lock().is_empty());
    }

    #[test]
    fn test_watch_targets_skip_nested_dirs() {
        let site = site();
        let targets = watch_targets(&site.config);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, site.config.build.pages);
    }
}
