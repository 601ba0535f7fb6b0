//! Circular and overriding template inheritance for Tera.
//!
//! This crate adds an `{% overextends %}` directive on top of the
//! [Tera](https://keats.github.io/tera/) template engine. It allows the
//! template `foo/bar.html` to extend `foo/bar.html`: a *different* physical
//! file with the identical relative name, found later in the configured search
//! path. Typical uses:
//!
//! - A project-level template extends the application-level template it
//!   overrides, changing one block and inheriting the rest.
//! - An application template extends another application's template of the same
//!   relative name.
//!
//! # How resolution works
//!
//! Templates are looked up across an ordered list of search directories:
//! project directories first, then per-application directories
//! ([`EngineConfig`]). A plain lookup takes the first match. What makes
//! same-name inheritance possible is per-render exclusion bookkeeping: each
//! time an `{% overextends %}` directive resolves a name, the directory that
//! produced the *currently rendering* file is removed from that name's
//! candidate list, so the lookup continues to the next directory. The
//! bookkeeping is scoped to one render pass and shared across the whole
//! inheritance chain, which is what lets three same-named files in three
//! directories form a three-level chain without ever looping.
//!
//! When the candidates for a name run out, the render fails with
//! [`TemplateError::TemplateNotFound`]: more `overextends` levels than
//! distinct files is a configuration error, not something to paper over.
//!
//! Block collection, override, and `{{ super() }}` are Tera's: the directive is
//! rewritten into a standard `{% extends %}` against the parent file the
//! exclusion search selected, and Tera merges the chain as usual.
//!
//! # Example
//!
//! `templates/pages/home.html` (project level):
//!
//! ```text
//! {% overextends "pages/home.html" %}
//! {% block title %}Our home | {{ super() }}{% endblock %}
//! ```
//!
//! `apps/site/templates/pages/home.html` (application level):
//!
//! ```text
//! <title>{% block title %}Home{% endblock %}</title>
//! {% block body %}...{% endblock %}
//! ```
//!
//! ```rust,no_run
//! use overextends::{Engine, EngineConfig};
//! use tera::Context;
//!
//! let engine = Engine::new(EngineConfig::new(
//!     vec!["templates".into()],
//!     vec!["apps/site/templates".into()],
//! ));
//! let html = engine.render("pages/home.html", &Context::new())?;
//! # Ok::<(), overextends::TemplateError>(())
//! ```
//!
//! # Rules
//!
//! - A template body may contain at most one inheritance directive; a second
//!   `overextends` or a standard `extends` alongside one is a syntax error.
//! - `{% overextends %}` takes exactly one argument: a quoted name or a context
//!   variable holding one.
//! - The directive only works in templates loaded from the search path, whose
//!   origin (source directory) is known. Templates registered from strings
//!   cannot use it.
//!
//! # Origin tracking
//!
//! Every template loaded from disk carries an [`Origin`] recording the search
//! directory that produced it; this is unconditional engine behavior, not a
//! debug mode. The directive captures its template's origin at parse time and
//! uses the recorded directory for exclusion, not path arithmetic.

pub mod config;
mod directive;
pub mod engine;
pub mod error;
mod loader;
pub mod origin;
mod registry;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::TemplateError;
pub use origin::{Origin, make_origin};
