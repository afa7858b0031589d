//! Template evaluation against JSON data.

use serde_json::Value;

use super::ast::{Command, Node, Operand, Pipeline, Template};
use super::functions::Functions;
use crate::error::TemplateError;

/// Go templates print missing values like this.
const NO_VALUE: &str = "<no value>";

/// Truthiness: false, 0, "", nil and empty collections are false.
pub fn is_true(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as it appears in rendered output.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => NO_VALUE.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (_, Some(u)) => u.to_string(),
            _ => n.as_f64().map(|f| f.to_string()).unwrap_or_default(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_text).collect();
            format!("[{}]", items.join(" "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}:{}", key, to_text(value)))
                .collect();
            format!("map[{}]", entries.join(" "))
        }
    }
}

/// One evaluation of a compiled template.
pub struct Exec<'a> {
    functions: &'a Functions,
    root: &'a Value,
    globals: &'a Value,
}

impl<'a> Exec<'a> {
    /// `root` is the render data; `globals` is consulted for fields `root` lacks.
    pub fn new(functions: &'a Functions, root: &'a Value, globals: &'a Value) -> Self {
        Self {
            functions,
            root,
            globals,
        }
    }

    pub fn run(&self, template: &Template) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.nodes(&template.nodes, self.root, &mut out)?;
        Ok(out)
    }

    fn nodes(&self, nodes: &[Node], dot: &Value, out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            self.node(node, dot, out)?;
        }
        Ok(())
    }

    fn node(&self, node: &Node, dot: &Value, out: &mut String) -> Result<(), TemplateError> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Action(pipeline) => out.push_str(&to_text(&self.pipeline(pipeline, dot)?)),
            Node::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if is_true(&self.pipeline(condition, dot)?) {
                        return self.nodes(body, dot, out);
                    }
                }
                self.nodes(otherwise, dot, out)?;
            }
            Node::With {
                pipeline,
                body,
                otherwise,
            } => {
                let value = self.pipeline(pipeline, dot)?;
                if is_true(&value) {
                    self.nodes(body, &value, out)?;
                } else {
                    self.nodes(otherwise, dot, out)?;
                }
            }
            Node::Range {
                pipeline,
                body,
                otherwise,
            } => {
                let value = self.pipeline(pipeline, dot)?;
                let items: Vec<&Value> = match &value {
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(map) => map.values().collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(TemplateError::Eval(format!(
                            "range can't iterate over {}",
                            to_text(other)
                        )));
                    }
                };

                if items.is_empty() {
                    self.nodes(otherwise, dot, out)?;
                }
                for item in items {
                    self.nodes(body, item, out)?;
                }
            }
        }
        Ok(())
    }

    fn pipeline(&self, pipeline: &Pipeline, dot: &Value) -> Result<Value, TemplateError> {
        let mut previous = None;
        for command in &pipeline.commands {
            previous = Some(self.command(command, dot, previous)?);
        }
        Ok(previous.unwrap_or(Value::Null))
    }

    fn command(
        &self,
        command: &Command,
        dot: &Value,
        previous: Option<Value>,
    ) -> Result<Value, TemplateError> {
        let Some((first, rest)) = command.args.split_first() else {
            return Ok(Value::Null);
        };

        if let Operand::Function(name) = first {
            let mut args = rest
                .iter()
                .map(|arg| self.operand(arg, dot))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(previous);
            return self.call(name, &args);
        }

        if !rest.is_empty() || previous.is_some() {
            return Err(TemplateError::NotCallable(describe(first)));
        }
        self.operand(first, dot)
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, TemplateError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| TemplateError::UnknownFunction(name.to_string()))?;
        function(args)
    }

    fn operand(&self, operand: &Operand, dot: &Value) -> Result<Value, TemplateError> {
        match operand {
            Operand::Field(path) => self.field(dot, path, "."),
            Operand::Root(path) => self.field(self.root, path, "$."),
            Operand::Function(name) => self.call(name, &[]),
            Operand::Str(s) => Ok(Value::String(s.clone())),
            Operand::Int(i) => Ok(Value::from(*i)),
            Operand::Float(f) => Ok(serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Null),
            Operand::Pipeline(inner) => self.pipeline(inner, dot),
        }
    }

    fn field(&self, base: &Value, path: &[String], prefix: &str) -> Result<Value, TemplateError> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(base.clone());
        };
        let missing = || TemplateError::MissingField(format!("{}{}", prefix, path.join(".")));

        // Globals only back the top-level data, never a range or with element.
        let mut current = match base.get(first.as_str()) {
            Some(value) => value,
            None if std::ptr::eq(base, self.root) => {
                self.globals.get(first.as_str()).ok_or_else(missing)?
            }
            None => return Err(missing()),
        };

        for segment in rest {
            current = current.get(segment.as_str()).ok_or_else(missing)?;
        }
        Ok(current.clone())
    }
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Field(path) => format!(".{}", path.join(".")),
        Operand::Root(path) => format!("$.{}", path.join(".")),
        Operand::Str(s) => format!("{s:?}"),
        Operand::Int(i) => i.to_string(),
        Operand::Float(f) => f.to_string(),
        Operand::Bool(b) => b.to_string(),
        Operand::Nil => "nil".to_string(),
        Operand::Function(name) => name.clone(),
        Operand::Pipeline(_) => "(pipeline)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::template::parser::parse;
    use crate::template::patterns::Regexes;

    fn render(source: &str, data: Value) -> Result<String, TemplateError> {
        render_with_globals(source, data, json!({}))
    }

    fn render_with_globals(
        source: &str,
        data: Value,
        globals: Value,
    ) -> Result<String, TemplateError> {
        let functions = Functions::new(Regexes::default());
        let template = parse(source)?;
        Exec::new(&functions, &data, &globals).run(&template)
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(
            render("Hello {{ .Name }}", json!({"Name": "World"})),
            Ok("Hello World".to_string())
        );
        assert_eq!(
            render("{{ .A.B }}", json!({"A": {"B": 3}})),
            Ok("3".to_string())
        );
    }

    #[test]
    fn test_missing_field_is_an_error() {
        assert_eq!(
            render("{{ .Nope }}", json!({})),
            Err(TemplateError::MissingField(".Nope".to_string()))
        );
        assert_eq!(
            render("{{ .A.Nope }}", json!({"A": {}})),
            Err(TemplateError::MissingField(".A.Nope".to_string()))
        );
    }

    #[test]
    fn test_globals_fallback() {
        let globals = json!({"Shell": "zsh", "Env": {"HOME": "/home/me"}});
        assert_eq!(
            render_with_globals("{{ .Shell }} {{ .Env.HOME }}", json!({}), globals.clone()),
            Ok("zsh /home/me".to_string())
        );
        // Data wins over globals.
        assert_eq!(
            render_with_globals("{{ .Shell }}", json!({"Shell": "fish"}), globals),
            Ok("fish".to_string())
        );
    }

    #[test]
    fn test_globals_not_visible_from_range_element() {
        let globals = json!({"Shell": "zsh"});
        let data = json!({"Items": [{"X": 1}]});
        let source = "{{ range .Items }}{{ .Shell }};{{ end }}";
        assert_eq!(
            render_with_globals(source, data.clone(), globals.clone()),
            Err(TemplateError::MissingField(".Shell".to_string()))
        );
        assert_eq!(
            render_with_globals("{{ range .Items }}{{ $.Shell }};{{ end }}", data, globals),
            Ok("zsh;".to_string())
        );
    }

    #[test]
    fn test_match_function() {
        assert_eq!(
            render(r#"{{ match "^a" .Text }}"#, json!({"Text": "abc"})),
            Ok("true".to_string())
        );
    }

    #[test]
    fn test_pipeline_passes_previous_value_last() {
        assert_eq!(
            render(r#"{{ .Text | upper | printf "%s!" }}"#, json!({"Text": "abc"})),
            Ok("ABC!".to_string())
        );
        assert_eq!(
            render(r#"{{ "X" | replaceP "b" .Text }}"#, json!({"Text": "abc"})),
            Ok("aXc".to_string())
        );
        assert_eq!(
            render(r#"{{ .V | printf "%d%%" }}"#, json!({"V": 42})),
            Ok("42%".to_string())
        );
    }

    #[test]
    fn test_if_else() {
        let source = "{{ if gt .N 10 }}big{{ else if gt .N 0 }}small{{ else }}none{{ end }}";
        assert_eq!(render(source, json!({"N": 20})), Ok("big".to_string()));
        assert_eq!(render(source, json!({"N": 5})), Ok("small".to_string()));
        assert_eq!(render(source, json!({"N": 0})), Ok("none".to_string()));
    }

    #[test]
    fn test_with_rebinds_dot() {
        let source = "{{ with .User }}{{ .Name }}{{ else }}anonymous{{ end }}";
        assert_eq!(
            render(source, json!({"User": {"Name": "me"}})),
            Ok("me".to_string())
        );
        assert_eq!(render(source, json!({"User": null})), Ok("anonymous".to_string()));
    }

    #[test]
    fn test_range() {
        let source = "{{ range .Items }}[{{ . }}]{{ else }}empty{{ end }}";
        assert_eq!(
            render(source, json!({"Items": ["a", "b"]})),
            Ok("[a][b]".to_string())
        );
        assert_eq!(render(source, json!({"Items": []})), Ok("empty".to_string()));
        assert!(render(source, json!({"Items": 3})).is_err());
    }

    #[test]
    fn test_root_access_inside_range() {
        let source = "{{ range .Items }}{{ $.Sep }}{{ . }}{{ end }}";
        assert_eq!(
            render(source, json!({"Items": [1, 2], "Sep": "/"})),
            Ok("/1/2".to_string())
        );
    }

    #[test]
    fn test_non_function_with_arguments() {
        assert!(matches!(
            render("{{ .A 1 }}", json!({"A": 1})),
            Err(TemplateError::NotCallable(_))
        ));
    }

    #[test]
    fn test_unknown_function_at_runtime() {
        assert_eq!(
            render("{{ nope }}", json!({})),
            Err(TemplateError::UnknownFunction("nope".to_string()))
        );
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(to_text(&json!(null)), "<no value>");
        assert_eq!(to_text(&json!(2.5)), "2.5");
        assert_eq!(to_text(&json!(3)), "3");
        assert_eq!(to_text(&json!([1, "a"])), "[1 a]");
        assert_eq!(to_text(&json!({"k": true})), "map[k:true]");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_true(&json!(0)));
        assert!(!is_true(&json!("")));
        assert!(!is_true(&json!([])));
        assert!(is_true(&json!(0.5)));
        assert!(is_true(&json!({"a": 1})));
    }
}
