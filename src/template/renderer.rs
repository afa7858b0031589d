//! Template renderer with a per-process compiled template cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::ast::Template;
use super::context::{CACHE_KEY, Context};
use super::eval::Exec;
use super::functions::Functions;
use super::parser::parse;
use super::patterns::Regexes;
use crate::cache::{CacheService, TypedCache};
use crate::error::TemplateError;

/// Compiles and evaluates templates. Shared by every segment task.
pub struct Renderer {
    context: Context,
    globals: Value,
    templates: TypedCache<String, Arc<Template>>,
    functions: Arc<Functions>,
    compiled: AtomicUsize,
}

impl Renderer {
    pub fn new(context: Context) -> Self {
        Self {
            globals: context.globals(),
            context,
            templates: TypedCache::unbounded("templates"),
            functions: Arc::new(Functions::new(Regexes::default())),
            compiled: AtomicUsize::new(0),
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Render `source` against `data`. An empty source renders as an empty string.
    pub fn render<T: Serialize>(&self, source: &str, data: &T) -> Result<String, TemplateError> {
        if source.is_empty() {
            return Ok(String::new());
        }

        let template = self.compile(source)?;
        let data = serde_json::to_value(data)
            .map_err(|e| TemplateError::Eval(format!("unusable template data: {e}")))?;

        Exec::new(&self.functions, &data, &self.globals).run(&template)
    }

    /// Fetch a compiled template, compiling it on first use.
    ///
    /// Concurrent first uses of the same source share one compilation.
    /// Failures are not cached.
    pub fn compile(&self, source: &str) -> Result<Arc<Template>, TemplateError> {
        self.templates
            .get_or_try_insert_with(source.to_string(), || {
                let start = Instant::now();
                let template = parse(source)?;

                if let Some(unknown) = template
                    .functions()
                    .into_iter()
                    .find(|name| !self.functions.contains(name))
                {
                    return Err(TemplateError::UnknownFunction(unknown.to_string()));
                }

                self.compiled.fetch_add(1, Ordering::Relaxed);
                trace!("Compiled template {:?} in {:?}", source, start.elapsed());
                Ok(Arc::new(template))
            })
            .map_err(|e| (*e).clone())
    }

    /// Number of templates compiled by this renderer.
    pub fn compiled_count(&self) -> usize {
        self.compiled.load(Ordering::Relaxed)
    }

    /// Keep the render context for the next run of this session.
    pub fn save_cache(&self, cache: &CacheService) {
        cache.session().set(CACHE_KEY, &self.context);
        debug!("Saved template context to session cache");
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("templates", &self.templates)
            .field("compiled", &self.compiled_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::cache::{CacheConfig, CacheLocation};
    use crate::runtime::SystemInfo;
    use crate::runtime::mock::MockEnvironment;

    fn renderer() -> Renderer {
        let env = MockEnvironment::new("bash", "/home/me").with_env("HOME", "/home/me");
        Renderer::new(Context::new(&env, HashMap::new(), HashMap::new()))
    }

    #[test]
    fn test_hello_world() {
        let renderer = renderer();
        let out = renderer.render("Hello {{ .Name }}", &json!({"Name": "World"}));
        assert_eq!(out, Ok("Hello World".to_string()));
    }

    #[test]
    fn test_match() {
        let renderer = renderer();
        let out = renderer.render(r#"{{ match "^a" .Text }}"#, &json!({"Text": "abc"}));
        assert_eq!(out, Ok("true".to_string()));
    }

    #[test]
    fn test_empty_source() {
        let renderer = renderer();
        assert_eq!(renderer.render("", &json!({})), Ok(String::new()));
        assert_eq!(renderer.compiled_count(), 0);
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let renderer = renderer();
        for name in ["a", "b", "c"] {
            let out = renderer.render("{{ .Name }}", &json!({"Name": name}));
            assert_eq!(out, Ok(name.to_string()));
        }
        assert_eq!(renderer.compiled_count(), 1);

        let first = renderer.compile("{{ .Name }}").unwrap();
        let second = renderer.compile("{{ .Name }}").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_first_use_compiles_once() {
        let renderer = renderer();
        std::thread::scope(|s| {
            for i in 0..16 {
                let renderer = &renderer;
                s.spawn(move || {
                    let out = renderer.render("{{ .N }}!", &json!({"N": i}));
                    assert_eq!(out, Ok(format!("{i}!")));
                });
            }
        });
        assert_eq!(renderer.compiled_count(), 1);
    }

    #[test]
    fn test_many_templates_stay_compiled() {
        let renderer = renderer();
        for i in 0..300 {
            let source = format!("{{{{ .Name }}}}-{i}");
            assert!(renderer.compile(&source).is_ok());
        }
        assert_eq!(renderer.compiled_count(), 300);

        for i in 0..300 {
            let source = format!("{{{{ .Name }}}}-{i}");
            assert!(renderer.compile(&source).is_ok());
        }
        assert_eq!(renderer.compiled_count(), 300);
    }

    #[test]
    fn test_errors_are_returned() {
        let renderer = renderer();
        assert_eq!(
            renderer.render("{{ .Missing }}", &json!({})),
            Err(TemplateError::MissingField(".Missing".to_string()))
        );
        assert!(matches!(
            renderer.render("{{ .Name ", &json!({})),
            Err(TemplateError::Parse { .. })
        ));
        assert_eq!(
            renderer.render("{{ nope .Name }}", &json!({"Name": 1})),
            Err(TemplateError::UnknownFunction("nope".to_string()))
        );
        // Failed compilations are not cached.
        assert_eq!(renderer.compiled_count(), 0);
    }

    #[test]
    fn test_globals_are_visible() {
        let renderer = renderer();
        let out = renderer.render("{{ .Shell }} in {{ .Env.HOME }}", &json!({}));
        assert_eq!(out, Ok("bash in /home/me".to_string()));
    }

    #[test]
    fn test_round_sysinfo() {
        let renderer = renderer();
        let info = SystemInfo {
            physical_percent_used: 45.678,
            ..Default::default()
        };
        let mut data = serde_json::to_value(&info).unwrap();
        data["Precision"] = json!(2);

        let out = renderer.render(" {{ round .PhysicalPercentUsed .Precision }} ", &data);
        assert_eq!(out, Ok(" 45.68 ".to_string()));
    }

    #[test]
    fn test_save_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheService::init(
            CacheLocation {
                dir: dir.path().to_path_buf(),
                session_id: "s".to_string(),
                pwd: "/home/me".to_string(),
            },
            CacheConfig::default(),
        );

        renderer().save_cache(&cache);
        let saved: Context = cache.session().get(CACHE_KEY).unwrap();
        assert_eq!(saved.shell, "bash");
        assert!(saved.env.is_empty());
    }
}
