//! `[templates]` section configuration.
//!
//! Options handed through to the template engine, plus the live-reload
//! tracking switch.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `[templates]` section in syllabus.toml.
///
/// # Example
/// ```toml
/// [templates]
/// reload_on_partial_change = true
///
/// [templates.compile]
/// strict = true
///
/// [templates.runtime.data]
/// semester = "Fall"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Track partial references per page and reload affected pages on change.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub reload_on_partial_change: bool,

    /// Options applied when a page template is compiled.
    pub compile: CompileOptions,

    /// Options applied on every render.
    pub runtime: RuntimeOptions,
}

/// Compile-time engine options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Missing fields and partials become render errors.
    pub strict: bool,
    /// Keep partial bodies at their own indentation.
    pub prevent_indent: bool,
    /// Emit values without HTML escaping.
    pub no_escape: bool,
}

/// Render-time engine options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Values visible to every page, shadowed by the page's own context.
    pub data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;
    use serde_json::json;

    #[test]
    fn test_templates_defaults() {
        let config: SiteConfig = toml::from_str("").unwrap();

        assert!(config.templates.reload_on_partial_change);
        assert!(!config.templates.compile.strict);
        assert!(!config.templates.compile.prevent_indent);
        assert!(!config.templates.compile.no_escape);
        assert!(config.templates.runtime.data.is_empty());
    }

    #[test]
    fn test_templates_full() {
        let config = r#"
            [templates]
            reload_on_partial_change = false

            [templates.compile]
            strict = true
            no_escape = true

            [templates.runtime.data]
            semester = "Fall"
            weeks = 14
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert!(!config.templates.reload_on_partial_change);
        assert!(config.templates.compile.strict);
        assert!(config.templates.compile.no_escape);
        assert!(!config.templates.compile.prevent_indent);
        assert_eq!(config.templates.runtime.data.get("semester"), Some(&json!("Fall")));
        assert_eq!(config.templates.runtime.data.get("weeks"), Some(&json!(14)));
    }

    #[test]
    fn test_compile_unknown_option_rejected() {
        let config = r#"
            [templates.compile]
            knownHelpersOnly = true
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);
        assert!(result.is_err());
    }
}
