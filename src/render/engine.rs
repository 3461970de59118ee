//! Template engine seam and its Handlebars implementation.

use super::{error::EngineError, page::PageId};
use crate::config::{CompileOptions, RuntimeOptions};
use handlebars::{Handlebars, handlebars_helper};
use serde_json::{Map, Value};

/// What the render cache needs from a template engine.
///
/// Partials live in the engine's registry and are looked up by name at
/// render time; what happens when one is missing is up to the engine.
pub trait TemplateEngine {
    /// Render-ready form of a page template.
    type Compiled;

    /// Register or overwrite a partial.
    fn register_partial(&mut self, name: &str, content: &str) -> Result<(), EngineError>;

    fn compile(
        &mut self,
        page: &PageId,
        source: &str,
        options: &CompileOptions,
    ) -> Result<Self::Compiled, EngineError>;

    fn render(
        &self,
        compiled: &Self::Compiled,
        context: &Map<String, Value>,
        runtime: &RuntimeOptions,
    ) -> Result<String, EngineError>;
}

handlebars_helper!(resolve_from_root: |path: str| format!("/{path}"));

/// Handle to a page template compiled into the Handlebars registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPage {
    name: String,
}

/// Handlebars-backed engine.
///
/// Page templates are registered under a `page:` prefixed name so they never
/// shadow a partial of the same name.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("resolve-from-root", Box::new(resolve_from_root));
        Self { registry }
    }

    fn apply(&mut self, options: &CompileOptions) {
        self.registry.set_strict_mode(options.strict);
        self.registry.set_prevent_indent(options.prevent_indent);
        if options.no_escape {
            self.registry.register_escape_fn(handlebars::no_escape);
        } else {
            self.registry.unregister_escape_fn();
        }
    }
}

impl TemplateEngine for HandlebarsEngine {
    type Compiled = CompiledPage;

    fn register_partial(&mut self, name: &str, content: &str) -> Result<(), EngineError> {
        self.registry.register_partial(name, content)?;
        Ok(())
    }

    fn compile(
        &mut self,
        page: &PageId,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompiledPage, EngineError> {
        self.apply(options);
        let name = format!("page:{page}");
        self.registry.register_template_string(&name, source)?;
        Ok(CompiledPage { name })
    }

    fn render(
        &self,
        compiled: &CompiledPage,
        context: &Map<String, Value>,
        runtime: &RuntimeOptions,
    ) -> Result<String, EngineError> {
        let mut data = runtime.data.clone();
        data.extend(context.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(self.registry.render(&compiled.name, &Value::Object(data))?)
    }
}
