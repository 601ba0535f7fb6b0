//! The rendering engine: inheritance-chain expansion over Tera.
//!
//! [`Engine`] owns the search directory configuration and any string-registered
//! templates, and nothing else. Each call to [`Engine::render`] builds its own
//! [`ExclusionRegistry`] and its own `Tera` instance, expands the inheritance
//! chain starting at the requested template, and hands the expanded set to Tera
//! for block merging and rendering. Because all per-render state lives in
//! locals of the render call, parallel renders are isolated by construction.
//!
//! Chain expansion walks parent links until it reaches a template with no
//! inheritance directive. A scoped `{% overextends %}` link resolves its parent
//! over the remaining (shrinking) candidate directories for that name; a
//! standard `{% extends %}` link resolves over the full search path. Every
//! template in the chain is registered under a unique internal name and the
//! child's directive is rewritten into a standard `{% extends %}` aimed at that
//! name, so Tera's own inheritance machinery does the rest.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde_json::Value;
use tera::{Context, Tera};

use crate::config::EngineConfig;
use crate::directive::{self, InheritanceNode, ParentExpr};
use crate::error::TemplateError;
use crate::loader;
use crate::origin::Origin;
use crate::registry::ExclusionRegistry;

/// Upper bound on inheritance chain length.
///
/// Same-name cycles are cut by directory exclusion well before this; the cap
/// exists for chains of *distinct* names wired into a loop with standard
/// `{% extends %}`, which exclusion does not govern.
const MAX_INHERITANCE_DEPTH: usize = 16;

/// Internal name given to templates rendered directly from strings.
const ANONYMOUS_TEMPLATE: &str = "__overextends_string_template__";

/// Template engine with support for scoped (`overextends`) inheritance.
///
/// # Examples
///
/// ```rust,no_run
/// use overextends::{Engine, EngineConfig};
/// use tera::Context;
///
/// let engine = Engine::new(EngineConfig::new(
///     vec!["templates".into()],
///     vec!["apps/blog/templates".into()],
/// ));
///
/// // templates/greeting.html may contain {% overextends "greeting.html" %}
/// // to extend apps/blog/templates/greeting.html under the same name.
/// let html = engine.render("greeting.html", &Context::new())?;
/// # Ok::<(), overextends::TemplateError>(())
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    /// Templates compiled from strings rather than loaded from disk. These have
    /// no origin and double as the "ready template object" population: a parent
    /// expression resolving to a registered name uses it directly, bypassing
    /// the directory search.
    registered: HashMap<String, String>,
}

impl Engine {
    /// Create an engine over the given search directory configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        tracing::debug!(
            template_dirs = config.template_dirs.len(),
            app_template_dirs = config.app_template_dirs.len(),
            "creating template engine"
        );
        Self {
            config,
            registered: HashMap::new(),
        }
    }

    /// The engine's search directory configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a template from a string.
    ///
    /// Registered templates take precedence over the search path when a render
    /// or parent lookup names them. They carry no origin, so they cannot host
    /// an `overextends` directive themselves.
    pub fn add_raw_template(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.registered.insert(name.into(), source.into());
    }

    /// Render the named template with the given context.
    ///
    /// This is one render pass: a fresh exclusion registry and a fresh Tera
    /// instance are created, the inheritance chain is expanded, and Tera
    /// renders the merged result.
    ///
    /// # Errors
    ///
    /// Propagates [`TemplateError::SyntaxError`] for malformed directives,
    /// [`TemplateError::TemplateNotFound`] when a lookup (including an
    /// exhausted same-name chain) fails, and [`TemplateError::Render`] for
    /// failures inside Tera.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        tracing::debug!(template = name, "starting render pass");
        let (source, origin) = self.load(name)?;
        let mut pass = RenderPass::new(self);
        let entry = pass.names.allocate(name);
        pass.expand(&entry, &source, origin.as_ref(), context, 0)?;
        pass.finish(&entry, context)
    }

    /// Render a template supplied as a string.
    ///
    /// The template has no origin, so an `overextends` directive inside it is a
    /// syntax error; standard `{% extends %}` against the search path works.
    pub fn render_str(&self, source: &str, context: &Context) -> Result<String, TemplateError> {
        let mut pass = RenderPass::new(self);
        let entry = pass.names.allocate(ANONYMOUS_TEMPLATE);
        pass.expand(&entry, source, None, context, 0)?;
        pass.finish(&entry, context)
    }

    /// Load a template by name: registered templates first, then the full
    /// search path.
    fn load(&self, name: &str) -> Result<(String, Option<Origin>), TemplateError> {
        if let Some(source) = self.registered.get(name) {
            tracing::debug!(template = name, "using registered template");
            return Ok((source.clone(), None));
        }
        loader::find_template(name, &self.config.search_dirs())
    }
}

/// State for one render pass: the expanded template set, the exclusion
/// registry, and the internal-name allocator. Dropped when the pass ends.
struct RenderPass<'engine> {
    engine: &'engine Engine,
    registry: ExclusionRegistry,
    names: InternalNames,
    /// Internal name and rewritten source of every template in the chain.
    templates: Vec<(String, String)>,
}

impl<'engine> RenderPass<'engine> {
    fn new(engine: &'engine Engine) -> Self {
        Self {
            engine,
            registry: ExclusionRegistry::new(),
            names: InternalNames::default(),
            templates: Vec::new(),
        }
    }

    /// Expand one template and, recursively, its inheritance chain.
    fn expand(
        &mut self,
        internal_name: &str,
        source: &str,
        origin: Option<&Origin>,
        context: &Context,
        depth: usize,
    ) -> Result<(), TemplateError> {
        if depth > MAX_INHERITANCE_DEPTH {
            return Err(TemplateError::SyntaxError {
                message: format!(
                    "template inheritance chain exceeds {MAX_INHERITANCE_DEPTH} levels"
                ),
            });
        }

        match directive::parse_inheritance(source, origin)? {
            None => {
                self.templates.push((internal_name.to_string(), source.to_string()));
                Ok(())
            }
            Some(InheritanceNode::Standard(node)) => {
                // Plain Tera inheritance: no exclusion bookkeeping, parent
                // resolved over the full search path.
                let (parent_source, parent_origin) = self.engine.load(&node.parent)?;
                let parent_internal = self.names.allocate(&node.parent);
                let rewritten = rewrite_standard(source, node.span, &parent_internal);
                self.templates.push((internal_name.to_string(), rewritten));
                self.expand(&parent_internal, &parent_source, parent_origin.as_ref(), context, depth + 1)
            }
            Some(InheritanceNode::Scoped(node)) => {
                tracing::trace!(
                    template = %node.template_name,
                    path = %node.template_path.display(),
                    "expanding scoped inheritance directive"
                );
                self.registry.populate(&node.template_name, &self.engine.config);
                self.registry.remove(&node.template_name, &node.template_dir)?;

                let parent_name = resolve_parent(&node.parent, context)?;
                let (parent_source, parent_origin) =
                    if let Some(source) = self.engine.registered.get(&parent_name) {
                        // Ready template object: use it directly as the parent.
                        (source.clone(), None)
                    } else {
                        let dirs: Vec<PathBuf> = match self.registry.remaining(&parent_name) {
                            Some(remaining) => remaining.to_vec(),
                            None => self.engine.config.search_dirs(),
                        };
                        loader::find_template(&parent_name, &dirs)?
                    };

                let parent_internal = self.names.allocate(&parent_name);
                let rewritten = rewrite_scoped(source, node.span, &parent_internal);
                self.templates.push((internal_name.to_string(), rewritten));
                self.expand(&parent_internal, &parent_source, parent_origin.as_ref(), context, depth + 1)
            }
        }
    }

    /// Register the expanded chain with a fresh Tera instance and render.
    ///
    /// Registration happens in one batch because Tera resolves parent links for
    /// the whole set at once.
    fn finish(self, entry: &str, context: &Context) -> Result<String, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(self.templates)?;
        tracing::debug!(template = entry, "rendering expanded inheritance chain");
        Ok(tera.render(entry, context)?)
    }
}

/// Allocator for unique per-render template names.
///
/// A chain of same-named templates needs distinct registration names; the
/// first use of a name keeps it unchanged and later uses get a numeric suffix.
#[derive(Default)]
struct InternalNames {
    used: HashSet<String>,
}

impl InternalNames {
    fn allocate(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{name}@{counter}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Resolve a parent expression against the render context.
///
/// Empty or non-string results are syntax errors; the message includes the
/// offending value and, for variable expressions, the variable's token.
fn resolve_parent(expr: &ParentExpr, context: &Context) -> Result<String, TemplateError> {
    match expr {
        ParentExpr::Literal(name) => {
            if name.is_empty() {
                return Err(TemplateError::SyntaxError {
                    message: "invalid template name in 'overextends' tag: \"\"".to_string(),
                });
            }
            Ok(name.clone())
        }
        ParentExpr::Variable(token) => {
            let value = lookup_variable(context, token);
            let resolved = value
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string);
            resolved.ok_or_else(|| {
                let got = value.map_or_else(|| "undefined".to_string(), Value::to_string);
                TemplateError::SyntaxError {
                    message: format!(
                        "invalid template name in 'overextends' tag: {got}. \
                         Got this from the '{token}' variable"
                    ),
                }
            })
        }
    }
}

/// Look up a possibly dotted variable token in the render context.
fn lookup_variable<'a>(context: &'a Context, token: &str) -> Option<&'a Value> {
    let mut parts = token.split('.');
    let mut value = context.get(parts.next()?)?;
    for part in parts {
        value = value.get(part)?;
    }
    Some(value)
}

/// Replace a standard `{% extends %}` tag with one naming the internally
/// registered parent, in place.
fn rewrite_standard(source: &str, span: (usize, usize), parent_internal: &str) -> String {
    format!(
        "{}{{% extends \"{}\" %}}{}",
        &source[..span.0],
        parent_internal,
        &source[span.1..]
    )
}

/// Rewrite an `overextends` directive into a standard `{% extends %}` at the
/// top of the body.
///
/// Tera requires `extends` to be the first tag of a template, while
/// `overextends` may appear anywhere, so the rewritten tag is emitted up front
/// and the original span dropped.
fn rewrite_scoped(source: &str, span: (usize, usize), parent_internal: &str) -> String {
    format!(
        "{{% extends \"{}\" %}}{}{}",
        parent_internal,
        &source[..span.0],
        &source[span.1..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_names_disambiguate_repeats() {
        let mut names = InternalNames::default();
        assert_eq!(names.allocate("x.html"), "x.html");
        assert_eq!(names.allocate("x.html"), "x.html@1");
        assert_eq!(names.allocate("x.html"), "x.html@2");
        assert_eq!(names.allocate("y.html"), "y.html");
    }

    #[test]
    fn test_resolve_parent_literal() {
        let context = Context::new();
        let name =
            resolve_parent(&ParentExpr::Literal("base.html".to_string()), &context).unwrap();
        assert_eq!(name, "base.html");
    }

    #[test]
    fn test_resolve_parent_empty_literal_fails() {
        let context = Context::new();
        let err = resolve_parent(&ParentExpr::Literal(String::new()), &context).unwrap_err();
        assert!(err.to_string().contains("invalid template name"));
    }

    #[test]
    fn test_resolve_parent_variable() {
        let mut context = Context::new();
        context.insert("layout", "base.html");
        let name =
            resolve_parent(&ParentExpr::Variable("layout".to_string()), &context).unwrap();
        assert_eq!(name, "base.html");
    }

    #[test]
    fn test_resolve_parent_dotted_variable() {
        let mut context = Context::new();
        context.insert("site", &serde_json::json!({ "layout": "base.html" }));
        let name =
            resolve_parent(&ParentExpr::Variable("site.layout".to_string()), &context).unwrap();
        assert_eq!(name, "base.html");
    }

    #[test]
    fn test_resolve_parent_missing_variable_names_token() {
        let context = Context::new();
        let err = resolve_parent(&ParentExpr::Variable("layout".to_string()), &context)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'layout' variable"), "unexpected message: {msg}");
    }

    #[test]
    fn test_resolve_parent_empty_variable_value_fails() {
        let mut context = Context::new();
        context.insert("layout", "");
        let err = resolve_parent(&ParentExpr::Variable("layout".to_string()), &context)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"\""), "unexpected message: {msg}");
        assert!(msg.contains("'layout' variable"), "unexpected message: {msg}");
    }

    #[test]
    fn test_rewrite_scoped_moves_extends_to_front() {
        let source = "{# header #}\n{% overextends \"x.html\" %}\n{% block b %}v{% endblock %}";
        let start = source.find("{% overextends").unwrap();
        let end = start + "{% overextends \"x.html\" %}".len();
        let rewritten = rewrite_scoped(source, (start, end), "x.html@1");
        assert!(rewritten.starts_with("{% extends \"x.html@1\" %}"));
        assert!(!rewritten.contains("overextends"));
        assert!(rewritten.contains("{% block b %}"));
    }

    #[test]
    fn test_rewrite_standard_is_in_place() {
        let source = "{% extends \"base.html\" %}{% block b %}v{% endblock %}";
        let rewritten = rewrite_standard(source, (0, "{% extends \"base.html\" %}".len()), "base.html");
        assert_eq!(rewritten, source);
    }
}
