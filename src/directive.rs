//! Parsing of inheritance directives out of template source.
//!
//! Tera has no extension point for custom block tags, so the `overextends`
//! directive is recognized here, ahead of Tera compilation, by scanning the
//! source for inheritance tags. Tags inside `{% raw %}` blocks and `{# #}`
//! comments are ignored. The scan produces at most one inheritance node per
//! template body; the engine rewrites it into a standard `{% extends %}` aimed
//! at the resolved parent before handing the body to Tera, which performs all
//! block collection, override, and merge semantics.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;
use crate::origin::Origin;

/// Matches `{% extends ... %}` and `{% overextends ... %}` tags, including the
/// whitespace-trimming `{%- ... -%}` forms. The argument is captured raw and
/// compiled separately.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%-?\s*(overextends|extends)\b\s*([^%]*?)\s*-?%\}")
        .expect("inheritance tag pattern is valid")
});

/// Matches spans whose contents must not be scanned for tags: `{% raw %}`
/// blocks and template comments.
static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*raw\s*-?%\}.*?\{%-?\s*endraw\s*-?%\}|\{#.*?#\}")
        .expect("skip span pattern is valid")
});

/// The compiled parent-template expression of an inheritance tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParentExpr {
    /// A quoted template name, e.g. `{% overextends "foo/bar.html" %}`.
    Literal(String),
    /// A context variable reference, resolved at render time, e.g.
    /// `{% overextends layout %}`. Dotted lookups are supported.
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Extends,
    Overextends,
}

#[derive(Debug)]
struct ScannedTag {
    kind: TagKind,
    argument: String,
    start: usize,
    end: usize,
}

/// A scoped inheritance directive, one per occurrence in a parsed template.
///
/// Immutable after construction: the template name, path, and source directory
/// are captured from the parsing origin and never recomputed.
#[derive(Debug)]
pub(crate) struct OverextendsNode {
    /// The compiled parent-template expression.
    pub(crate) parent: ParentExpr,
    /// Relative name the enclosing template was loaded under.
    pub(crate) template_name: String,
    /// Absolute path of the enclosing template file.
    pub(crate) template_path: PathBuf,
    /// Search directory that produced the enclosing template.
    pub(crate) template_dir: PathBuf,
    /// Byte span of the directive in the source, for rewriting.
    pub(crate) span: (usize, usize),
}

/// A standard `{% extends %}` directive with a literal parent name.
#[derive(Debug)]
pub(crate) struct StandardExtendsNode {
    pub(crate) parent: String,
    pub(crate) span: (usize, usize),
}

/// The inheritance directive found in a template body, if any.
#[derive(Debug)]
pub(crate) enum InheritanceNode {
    /// Plain Tera inheritance: parent resolved over the full search path.
    Standard(StandardExtendsNode),
    /// Scoped inheritance: parent resolved with directory exclusion.
    Scoped(OverextendsNode),
}

/// Scan `source` for inheritance directives and validate their use.
///
/// Returns `Ok(None)` for templates with no inheritance tag. A template body
/// may contain at most one inheritance directive; `overextends` additionally
/// requires the enclosing template's origin to be known, since the directive
/// must exclude the directory the template was loaded from.
pub(crate) fn parse_inheritance(
    source: &str,
    origin: Option<&Origin>,
) -> Result<Option<InheritanceNode>, TemplateError> {
    let tags = scan_tags(source);

    let mut scoped = tags.iter().filter(|tag| tag.kind == TagKind::Overextends);
    let Some(tag) = scoped.next() else {
        return parse_standard(&tags);
    };

    let Some(origin) = origin else {
        return Err(TemplateError::SyntaxError {
            message: "'overextends' can only be used in templates loaded through a \
                      loader that records an origin"
                .to_string(),
        });
    };
    let parent = compile_parent_expr(&tag.argument, "overextends")?;
    if scoped.next().is_some() {
        return Err(TemplateError::SyntaxError {
            message: format!(
                "'overextends' cannot appear more than once in the same template \
                 (in '{}')",
                origin.display_name
            ),
        });
    }
    if tags.iter().any(|other| other.kind == TagKind::Extends) {
        return Err(TemplateError::SyntaxError {
            message: format!(
                "'overextends' cannot be combined with 'extends' in the same template \
                 (in '{}')",
                origin.display_name
            ),
        });
    }

    Ok(Some(InheritanceNode::Scoped(OverextendsNode {
        parent,
        template_name: origin.template_name.clone(),
        template_path: origin.path.clone(),
        template_dir: origin.directory.clone(),
        span: (tag.start, tag.end),
    })))
}

/// Handle templates that only use standard Tera inheritance.
fn parse_standard(tags: &[ScannedTag]) -> Result<Option<InheritanceNode>, TemplateError> {
    let mut standard = tags.iter().filter(|tag| tag.kind == TagKind::Extends);
    let Some(tag) = standard.next() else {
        return Ok(None);
    };
    if standard.next().is_some() {
        return Err(TemplateError::SyntaxError {
            message: "'extends' cannot appear more than once in the same template".to_string(),
        });
    }
    match compile_parent_expr(&tag.argument, "extends")? {
        ParentExpr::Literal(parent) => Ok(Some(InheritanceNode::Standard(StandardExtendsNode {
            parent,
            span: (tag.start, tag.end),
        }))),
        ParentExpr::Variable(token) => Err(TemplateError::SyntaxError {
            message: format!("'extends' requires a string literal argument, got the variable '{token}'"),
        }),
    }
}

fn scan_tags(source: &str) -> Vec<ScannedTag> {
    let skip_spans: Vec<(usize, usize)> = SKIP_RE
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .collect();

    TAG_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let skipped = skip_spans
                .iter()
                .any(|&(start, end)| whole.start() >= start && whole.start() < end);
            if skipped {
                return None;
            }
            let kind = if &caps[1] == "overextends" {
                TagKind::Overextends
            } else {
                TagKind::Extends
            };
            Some(ScannedTag {
                kind,
                argument: caps[2].trim().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Compile the raw argument text of an inheritance tag.
///
/// Exactly one argument is accepted: either a quoted template name or a bare
/// variable token. Anything else is a syntax error naming the tag.
pub(crate) fn compile_parent_expr(raw: &str, tag: &str) -> Result<ParentExpr, TemplateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TemplateError::SyntaxError {
            message: format!("'{tag}' takes one argument"),
        });
    }

    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote) {
            let Some(end) = inner.find(quote) else {
                return Err(TemplateError::SyntaxError {
                    message: format!("'{tag}' argument has an unterminated string literal"),
                });
            };
            let (literal, rest) = inner.split_at(end);
            if !rest[1..].trim().is_empty() {
                return Err(TemplateError::SyntaxError {
                    message: format!("'{tag}' takes one argument"),
                });
            }
            return Ok(ParentExpr::Literal(literal.to_string()));
        }
    }

    let mut parts = raw.split_whitespace();
    let token = parts.next().unwrap_or_default();
    if parts.next().is_some() {
        return Err(TemplateError::SyntaxError {
            message: format!("'{tag}' takes one argument"),
        });
    }
    let valid_variable = !token.starts_with('.')
        && !token.ends_with('.')
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid_variable {
        return Err(TemplateError::SyntaxError {
            message: format!("'{tag}' argument '{token}' is not a string literal or variable name"),
        });
    }
    Ok(ParentExpr::Variable(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn origin() -> Origin {
        crate::origin::make_origin(
            "/proj/templates/x.html",
            "x.html",
            Path::new("/proj/templates/x.html"),
            Path::new("/proj/templates"),
        )
        .unwrap()
    }

    #[test]
    fn test_plain_template_has_no_inheritance() {
        let node = parse_inheritance("hello {{ name }}", Some(&origin())).unwrap();
        assert!(node.is_none());
    }

    #[test]
    fn test_overextends_literal_parent() {
        let origin = origin();
        let source = "{% overextends \"x.html\" %}\n{% block body %}hi{% endblock %}";
        let node = parse_inheritance(source, Some(&origin)).unwrap().unwrap();
        match node {
            InheritanceNode::Scoped(node) => {
                assert_eq!(node.parent, ParentExpr::Literal("x.html".to_string()));
                assert_eq!(node.template_name, "x.html");
                assert_eq!(node.template_dir, PathBuf::from("/proj/templates"));
                assert_eq!(&source[node.span.0..node.span.1], "{% overextends \"x.html\" %}");
            }
            other => panic!("expected scoped node, got {other:?}"),
        }
    }

    #[test]
    fn test_overextends_variable_parent() {
        let source = "{% overextends layout.base %}";
        let node = parse_inheritance(source, Some(&origin())).unwrap().unwrap();
        match node {
            InheritanceNode::Scoped(node) => {
                assert_eq!(node.parent, ParentExpr::Variable("layout.base".to_string()));
            }
            other => panic!("expected scoped node, got {other:?}"),
        }
    }

    #[test]
    fn test_overextends_without_origin_fails() {
        let err = parse_inheritance("{% overextends \"x.html\" %}", None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("overextends"), "unexpected message: {msg}");
        assert!(msg.contains("origin"), "unexpected message: {msg}");
    }

    #[test]
    fn test_overextends_argument_count() {
        let origin = origin();
        for source in ["{% overextends %}", "{% overextends \"a.html\" \"b.html\" %}", "{% overextends a b %}"] {
            let err = parse_inheritance(source, Some(&origin)).unwrap_err();
            assert!(err.to_string().contains("one argument"), "source: {source}");
        }
    }

    #[test]
    fn test_duplicate_overextends_fails() {
        let source = "{% overextends \"x.html\" %}{% overextends \"y.html\" %}";
        let err = parse_inheritance(source, Some(&origin())).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_overextends_combined_with_extends_fails() {
        let source = "{% overextends \"x.html\" %}{% extends \"y.html\" %}";
        let err = parse_inheritance(source, Some(&origin())).unwrap_err();
        assert!(err.to_string().contains("cannot be combined"));
    }

    #[test]
    fn test_standard_extends_is_recognized() {
        let source = "{% extends \"base.html\" %}{% block b %}x{% endblock %}";
        let node = parse_inheritance(source, None).unwrap().unwrap();
        match node {
            InheritanceNode::Standard(node) => assert_eq!(node.parent, "base.html"),
            other => panic!("expected standard node, got {other:?}"),
        }
    }

    #[test]
    fn test_tags_in_raw_blocks_and_comments_are_ignored() {
        let source = "{% raw %}{% overextends \"x.html\" %}{% endraw %}\n\
                      {# {% extends \"y.html\" %} #}\nbody";
        let node = parse_inheritance(source, Some(&origin())).unwrap();
        assert!(node.is_none());
    }

    #[test]
    fn test_trim_markers_are_accepted() {
        let source = "{%- overextends 'x.html' -%}";
        let node = parse_inheritance(source, Some(&origin())).unwrap().unwrap();
        match node {
            InheritanceNode::Scoped(node) => {
                assert_eq!(node.parent, ParentExpr::Literal("x.html".to_string()));
            }
            other => panic!("expected scoped node, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_literal_fails() {
        let err = compile_parent_expr("\"x.html", "overextends").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_empty_literal_is_compiled() {
        // Emptiness is a render-time failure (resolution), not a parse failure.
        let expr = compile_parent_expr("\"\"", "overextends").unwrap();
        assert_eq!(expr, ParentExpr::Literal(String::new()));
    }
}
