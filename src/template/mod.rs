//! Template module - a small Go-template dialect for segment output.
//!
//! ## Architecture
//!
//! - `parser` - nom parser from source text to the [`ast::Template`] tree
//! - `eval` - evaluates a tree against JSON data plus the render [`Context`]
//! - `functions` - built-in pipeline functions (`match`, `replaceP`, `findP`, ...)
//! - `patterns` - memoized regular expressions behind the pattern functions
//! - `renderer` - [`Renderer`], caching compiled templates by source text
//!
//! ## Usage
//!
//! ```rust,ignore
//! let renderer = Renderer::new(Context::new(&env, vars, maps));
//! let out = renderer.render("Hello {{ .Name }}", &json!({"Name": "World"}))?;
//! assert_eq!(out, "Hello World");
//! ```

pub mod ast;
mod context;
mod eval;
mod functions;
mod parser;
mod patterns;
mod renderer;

pub use context::{CACHE_KEY, Context};
pub use eval::{is_true, to_text};
pub use functions::{Function, Functions};
pub use parser::parse;
pub use patterns::Regexes;
pub use renderer::Renderer;
