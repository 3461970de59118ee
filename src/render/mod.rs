//! Page rendering with a compiled-template cache and a partial index.
//!
//! [`PageRenderer`] owns three maps:
//!
//! | Map          | Key       | Value                     | Changes when               |
//! |--------------|-----------|---------------------------|----------------------------|
//! | `partials`   | name      | partial source            | a partial file is loaded   |
//! | `compiled`   | [`PageId`]| compiled page template    | first render / invalidated |
//! | `references` | [`PageId`]| partial names in source   | every render               |
//!
//! When a partial file changes, every page whose reference set contains its
//! name loses its compiled template and gets a reload signal.
//!
//! Rendering is fail-open: any error is logged and the page's original
//! source is returned, so a broken template never stops a build or the
//! dev server.

mod context;
mod engine;
mod error;
mod page;
mod partials;

pub use context::{ContextSource, site_context};
pub use engine::{HandlebarsEngine, TemplateEngine};
pub use error::RenderError;
pub use page::PageId;

use crate::{
    config::{CompileOptions, RuntimeOptions, SiteConfig},
    debug, log,
    reload::ReloadSink,
    utils::category::{is_html, is_partial_file, normalize_path},
};
use partials::{extract_references, list_partial_files, partial_name};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};

/// Settings for a [`PageRenderer`].
#[derive(Debug, Clone, Default)]
pub struct RendererOptions {
    /// Directories whose files are partials (already absolute).
    pub partial_dirs: Vec<PathBuf>,
    /// Track partial references per page on every render.
    pub reload_on_partial_change: bool,
    pub compile: CompileOptions,
    pub runtime: RuntimeOptions,
}

impl RendererOptions {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            partial_dirs: config.build.partials.clone(),
            reload_on_partial_change: config.templates.reload_on_partial_change,
            compile: config.templates.compile.clone(),
            runtime: config.templates.runtime.clone(),
        }
    }
}

/// Result of [`PageRenderer::render_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome<'a> {
    /// Template rendered.
    Rendered(String),
    /// Not an HTML output; source passed through untouched.
    Skipped(&'a str),
    /// Rendering failed and was logged; original source returned.
    Failed(&'a str),
}

impl<'a> RenderOutcome<'a> {
    pub fn into_html(self) -> Cow<'a, str> {
        match self {
            Self::Rendered(html) => Cow::Owned(html),
            Self::Skipped(source) | Self::Failed(source) => Cow::Borrowed(source),
        }
    }

    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Template render cache and partial index.
pub struct PageRenderer<E: TemplateEngine = HandlebarsEngine> {
    engine: E,
    options: RendererOptions,
    context: ContextSource,
    partials: FxHashMap<String, String>,
    compiled: FxHashMap<PageId, E::Compiled>,
    references: FxHashMap<PageId, FxHashSet<String>>,
}

impl PageRenderer<HandlebarsEngine> {
    /// Renderer for a site: Handlebars engine, `[context]` plus built-ins.
    pub fn for_site(config: &SiteConfig) -> Self {
        Self::new(
            HandlebarsEngine::new(),
            RendererOptions::from_config(config),
            site_context(config),
        )
    }
}

impl<E: TemplateEngine> PageRenderer<E> {
    pub fn new(engine: E, options: RendererOptions, context: ContextSource) -> Self {
        Self {
            engine,
            options,
            context,
            partials: FxHashMap::default(),
            compiled: FxHashMap::default(),
            references: FxHashMap::default(),
        }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    // ========================================================================
    // Partials
    // ========================================================================

    /// Register every partial file found directly inside `dirs`.
    ///
    /// Unreadable directories and files are logged and skipped. Returns the
    /// number of partials registered.
    pub fn load_all_partials(&mut self, dirs: &[PathBuf]) -> usize {
        let mut count = 0;

        for dir in dirs {
            let files = match list_partial_files(dir) {
                Ok(files) => files,
                Err(e) => {
                    log!("partials"; "cannot read {}: {e}", dir.display());
                    continue;
                }
            };

            for file in files {
                let Some(name) = partial_name(&file) else { continue };
                match fs::read_to_string(&file) {
                    Ok(content) => {
                        if self.register_partial(&name, content) {
                            count += 1;
                        }
                    }
                    Err(e) => log!("partials"; "cannot read {}: {e}", file.display()),
                }
            }
        }

        debug!("partials"; "registered {count} partials");
        count
    }

    fn register_partial(&mut self, name: &str, content: String) -> bool {
        match self.engine.register_partial(name, &content) {
            Ok(()) => {
                self.partials.insert(name.to_owned(), content);
                true
            }
            Err(e) => {
                log!("partials"; "{name}: {e}");
                false
            }
        }
    }

    /// Whether `path` lies under one of the configured partial directories.
    pub fn is_partial_path(&self, path: &Path) -> bool {
        let path = normalize_path(path);
        self.options.partial_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Handle a file change reported by the watcher.
    ///
    /// Paths outside every partial directory, or without a partial
    /// extension, are ignored. Otherwise the partial is re-read and
    /// re-registered, and each page referencing it loses its compiled
    /// template and gets one reload signal. On read failure nothing
    /// changes. Returns the invalidated pages.
    pub fn on_partial_file_changed(&mut self, path: &Path, reload: &dyn ReloadSink) -> Vec<PageId> {
        // non-partial files (notes, images) in a partial dir are skipped on
        // change, matching what load_all_partials registers
        if !is_partial_file(path) || !self.is_partial_path(path) {
            return Vec::new();
        }
        let Some(name) = partial_name(path) else {
            return Vec::new();
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log!("partials"; "cannot reload {name}: {e}");
                return Vec::new();
            }
        };
        if !self.register_partial(&name, content) {
            return Vec::new();
        }

        let mut affected: Vec<PageId> = self
            .references
            .iter()
            .filter(|(_, names)| names.contains(&name))
            .map(|(page, _)| page.clone())
            .collect();
        affected.sort();

        for page in &affected {
            self.compiled.remove(page);
            reload.full_reload(&page.url_path());
        }

        debug!("partials"; "{name} changed, {} pages invalidated", affected.len());
        affected
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Render a page, or return its source unchanged.
    ///
    /// `filename` is the page's source file; anything that is not an
    /// `.html` file is passed through.
    pub fn render_page<'a>(
        &mut self,
        page: &PageId,
        source: &'a str,
        filename: Option<&Path>,
    ) -> RenderOutcome<'a> {
        if !filename.is_some_and(is_html) {
            return RenderOutcome::Skipped(source);
        }

        match self.try_render(page, source) {
            Ok(html) => RenderOutcome::Rendered(html),
            Err(e) => {
                log!("render"; "{page}: {e}");
                RenderOutcome::Failed(source)
            }
        }
    }

    fn try_render(&mut self, page: &PageId, source: &str) -> Result<String, RenderError> {
        let context = self.context.resolve(page)?;

        if !self.compiled.contains_key(page) {
            let compiled = self
                .engine
                .compile(page, source, &self.options.compile)
                .map_err(RenderError::Compile)?;
            self.compiled.insert(page.clone(), compiled);
            debug!("render"; "compiled {page}");
        }

        if self.options.reload_on_partial_change {
            self.references.insert(page.clone(), extract_references(source));
        }

        let compiled = &self.compiled[page];
        self.engine
            .render(compiled, &context, &self.options.runtime)
            .map_err(RenderError::Render)
    }

    /// Drop a page's compiled template and references after its own
    /// source file changed.
    pub fn forget_page(&mut self, page: &PageId) -> bool {
        self.references.remove(page);
        self.compiled.remove(page).is_some()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    #[cfg(test)]
    pub fn partial(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(String::as_str)
    }

    #[cfg(test)]
    pub fn is_cached(&self, page: &PageId) -> bool {
        self.compiled.contains_key(page)
    }

    #[cfg(test)]
    pub fn references(&self, page: &PageId) -> Option<&FxHashSet<String>> {
        self.references.get(page)
    }
}
