//! Template context resolution.
//!
//! A page's context is resolved in two passes on every render:
//!
//! 1. the [`ContextSource`] yields a [`PageContext`], either the static one
//!    or whatever the provider returns for this page;
//! 2. every lazy entry of that context is called with the page and replaced
//!    by its value.
//!
//! Resolution is exactly one level deep. A lazy value returning an object is
//! used as-is; nothing inside it is resolved further.

use super::{
    error::{BoxError, RenderError},
    page::PageId,
};
use crate::{config::SiteConfig, debug};
use serde_json::{Map, Value};
use std::{collections::BTreeMap, fs};

type LazyFn = dyn Fn(&PageId) -> Result<Value, BoxError> + Send + Sync;
type ProviderFn = dyn Fn(&PageId) -> Result<PageContext, BoxError> + Send + Sync;

/// One context entry: a plain value or a per-page function.
pub enum ContextValue {
    Static(Value),
    Lazy(Box<LazyFn>),
}

/// Context object before lazy entries are resolved.
#[derive(Default)]
pub struct PageContext {
    values: BTreeMap<String, ContextValue>,
}

impl PageContext {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.values.insert(key.into(), ContextValue::Static(value));
        self
    }

    pub fn insert_lazy<F>(&mut self, key: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&PageId) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.values.insert(key.into(), ContextValue::Lazy(Box::new(f)));
        self
    }

    /// Replace every lazy entry with its value for `page`.
    pub fn resolve(&self, page: &PageId) -> Result<Map<String, Value>, RenderError> {
        self.values
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    ContextValue::Static(value) => value.clone(),
                    ContextValue::Lazy(f) => f(page).map_err(|source| RenderError::ContextValue {
                        key: key.clone(),
                        source,
                    })?,
                };
                Ok((key.clone(), value))
            })
            .collect()
    }
}

impl From<Map<String, Value>> for PageContext {
    fn from(map: Map<String, Value>) -> Self {
        let values = map
            .into_iter()
            .map(|(key, value)| (key, ContextValue::Static(value)))
            .collect();
        Self { values }
    }
}

/// Where a page's context comes from.
pub enum ContextSource {
    /// Same context object for every page.
    Static(PageContext),
    /// Context built per page.
    #[allow(dead_code)] // Reserved API
    Provider(Box<ProviderFn>),
}

impl Default for ContextSource {
    fn default() -> Self {
        Self::Static(PageContext::default())
    }
}

impl ContextSource {
    #[allow(dead_code)] // Reserved API
    pub fn provider<F>(f: F) -> Self
    where
        F: Fn(&PageId) -> Result<PageContext, BoxError> + Send + Sync + 'static,
    {
        Self::Provider(Box::new(f))
    }

    /// Resolve the context object handed to the template for `page`.
    pub fn resolve(&self, page: &PageId) -> Result<Map<String, Value>, RenderError> {
        match self {
            Self::Static(context) => context.resolve(page),
            Self::Provider(provider) => provider(page)
                .map_err(RenderError::Provider)?
                .resolve(page),
        }
    }
}

/// Static context for a site: the `[context]` table plus built-in values.
///
/// Built-ins never override keys set in `[context]`:
/// - `dev`: true while serving
/// - `page`: output path of the page being rendered
/// - `version`: `version` field of `version.json`, or null when absent
pub fn site_context(config: &SiteConfig) -> ContextSource {
    let mut context = PageContext::from(config.context.clone());

    if !config.context.contains_key("dev") {
        context.insert("dev", Value::Bool(config.dev));
    }
    if !config.context.contains_key("page") {
        context.insert_lazy("page", |page| Ok(Value::String(page.to_string())));
    }
    if !config.context.contains_key("version") {
        let version_file = config.version_file();
        context.insert_lazy("version", move |_| {
            let Ok(content) = fs::read_to_string(&version_file) else {
                return Ok(Value::Null);
            };
            let version = match serde_json::from_str::<Value>(&content) {
                Ok(data) => data.get("version").cloned().unwrap_or(Value::Null),
                Err(e) => {
                    debug!("render"; "ignoring {}: {e}", version_file.display());
                    Value::Null
                }
            };
            Ok(version)
        });
    }

    ContextSource::Static(context)
}
