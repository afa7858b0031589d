//! Functions available inside templates.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::eval::{is_true, to_text};
use super::patterns::Regexes;
use crate::error::TemplateError;

pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, TemplateError> + Send + Sync>;

/// Name to implementation table consulted at compile and render time.
#[derive(Clone)]
pub struct Functions {
    table: HashMap<&'static str, Function>,
}

impl Functions {
    /// The built-in functions, with the pattern functions backed by `regexes`.
    pub fn new(regexes: Regexes) -> Self {
        let mut functions = Self {
            table: HashMap::new(),
        };

        let re = regexes.clone();
        let matcher = move |args: &[Value]| -> Result<Value, TemplateError> {
            arity("match", args, 2)?;
            Ok(Value::Bool(re.is_match(&to_text(&args[0]), &to_text(&args[1]))))
        };
        functions.register("matchP", matcher.clone());
        functions.register("match", matcher);

        let re = regexes.clone();
        functions.register("replaceP", move |args| {
            arity("replaceP", args, 3)?;
            Ok(Value::String(re.replace_all(
                &to_text(&args[0]),
                &to_text(&args[1]),
                &to_text(&args[2]),
            )))
        });

        functions.register("findP", move |args| {
            arity("findP", args, 3)?;
            let index = usize::try_from(int_arg("findP", &args[2])?).unwrap_or(usize::MAX);
            Ok(Value::String(regexes.find(
                &to_text(&args[0]),
                &to_text(&args[1]),
                index,
            )))
        });

        functions.register("eq", eq);
        functions.register("ne", |args| {
            arity("ne", args, 2)?;
            Ok(Value::Bool(!equals(&args[0], &args[1])))
        });
        functions.register("lt", |args| compare("lt", args, |o| o == Ordering::Less));
        functions.register("le", |args| compare("le", args, |o| o != Ordering::Greater));
        functions.register("gt", |args| compare("gt", args, |o| o == Ordering::Greater));
        functions.register("ge", |args| compare("ge", args, |o| o != Ordering::Less));
        functions.register("and", and);
        functions.register("or", or);
        functions.register("not", |args| {
            arity("not", args, 1)?;
            Ok(Value::Bool(!is_true(&args[0])))
        });
        functions.register("len", len);
        functions.register("round", round);
        functions.register("lower", |args| {
            arity("lower", args, 1)?;
            Ok(Value::String(to_text(&args[0]).to_lowercase()))
        });
        functions.register("upper", |args| {
            arity("upper", args, 1)?;
            Ok(Value::String(to_text(&args[0]).to_uppercase()))
        });
        functions.register("trim", |args| {
            arity("trim", args, 1)?;
            Ok(Value::String(to_text(&args[0]).trim().to_string()))
        });
        functions.register("contains", |args| {
            arity("contains", args, 2)?;
            Ok(Value::Bool(to_text(&args[1]).contains(&to_text(&args[0]))))
        });
        functions.register("hasPrefix", |args| {
            arity("hasPrefix", args, 2)?;
            Ok(Value::Bool(to_text(&args[1]).starts_with(&to_text(&args[0]))))
        });
        functions.register("hasSuffix", |args| {
            arity("hasSuffix", args, 2)?;
            Ok(Value::Bool(to_text(&args[1]).ends_with(&to_text(&args[0]))))
        });
        functions.register("default", default);
        functions.register("printf", printf);

        functions
    }

    pub fn register<F>(&mut self, name: &'static str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, TemplateError> + Send + Sync + 'static,
    {
        self.table.insert(name, Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

impl std::fmt::Debug for Functions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.table.keys().collect();
        names.sort();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), TemplateError> {
    if args.len() != expected {
        return Err(TemplateError::bad_args(
            name,
            format!("want {expected} arguments, got {}", args.len()),
        ));
    }
    Ok(())
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn int_arg(name: &str, value: &Value) -> Result<i64, TemplateError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| TemplateError::bad_args(name, format!("{n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| TemplateError::bad_args(name, format!("{s:?} is not an integer"))),
        other => Err(TemplateError::bad_args(
            name,
            format!("{} is not an integer", to_text(other)),
        )),
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// `eq a b c` is true if `a` equals any of the others.
fn eq(args: &[Value]) -> Result<Value, TemplateError> {
    let Some((first, rest)) = args.split_first().filter(|(_, rest)| !rest.is_empty()) else {
        return Err(TemplateError::bad_args("eq", "want at least 2 arguments"));
    };
    Ok(Value::Bool(rest.iter().any(|other| equals(first, other))))
}

fn compare(
    name: &str,
    args: &[Value],
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, TemplateError> {
    arity(name, args, 2)?;
    let ordering = match (&args[0], &args[1]) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) => match (number(a), number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };

    ordering
        .map(|ordering| Value::Bool(accept(ordering)))
        .ok_or_else(|| TemplateError::bad_args(name, "incompatible types for comparison"))
}

/// First falsy argument, or the last one.
fn and(args: &[Value]) -> Result<Value, TemplateError> {
    let Some(last) = args.last() else {
        return Err(TemplateError::bad_args("and", "want at least 1 argument"));
    };
    Ok(args.iter().find(|arg| !is_true(arg)).unwrap_or(last).clone())
}

/// First truthy argument, or the last one.
fn or(args: &[Value]) -> Result<Value, TemplateError> {
    let Some(last) = args.last() else {
        return Err(TemplateError::bad_args("or", "want at least 1 argument"));
    };
    Ok(args.iter().find(|arg| is_true(arg)).unwrap_or(last).clone())
}

fn len(args: &[Value]) -> Result<Value, TemplateError> {
    arity("len", args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.len(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(TemplateError::bad_args(
                "len",
                format!("len of {} is undefined", to_text(other)),
            ));
        }
    };
    Ok(Value::from(len))
}

/// `round value precision`
fn round(args: &[Value]) -> Result<Value, TemplateError> {
    arity("round", args, 2)?;
    let value = match &args[0] {
        Value::String(s) => s.trim().parse().ok(),
        other => number(other),
    }
    .ok_or_else(|| TemplateError::bad_args("round", "value is not a number"))?;
    let precision = int_arg("round", &args[1])?.clamp(0, 15) as i32;

    let factor = 10f64.powi(precision);
    let rounded = (value * factor).round() / factor;
    Ok(serde_json::Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

/// `default fallback value` - `value` unless it is empty, otherwise `fallback`.
fn default(args: &[Value]) -> Result<Value, TemplateError> {
    match args {
        [fallback] => Ok(fallback.clone()),
        [fallback, value] if !is_true(value) => Ok(fallback.clone()),
        [_, value] => Ok(value.clone()),
        _ => Err(TemplateError::bad_args("default", "want 1 or 2 arguments")),
    }
}

/// A small `printf`: `%s`, `%v`, `%d`, `%f`, `%.Nf`, `%q` and `%%`.
fn printf(args: &[Value]) -> Result<Value, TemplateError> {
    let Some((format, mut rest)) = args.split_first() else {
        return Err(TemplateError::bad_args("printf", "missing format"));
    };
    let format = to_text(format);

    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            precision = digits.parse().ok();
        }

        let Some(verb) = chars.next() else {
            out.push_str("%!(NOVERB)");
            break;
        };
        if verb == '%' {
            out.push('%');
            continue;
        }

        let Some((arg, remaining)) = rest.split_first() else {
            out.push_str(&format!("%!{verb}(MISSING)"));
            continue;
        };
        rest = remaining;

        match verb {
            's' | 'v' => out.push_str(&to_text(arg)),
            'd' => out.push_str(&int_arg("printf", arg)?.to_string()),
            'f' => {
                let value = number(arg)
                    .ok_or_else(|| TemplateError::bad_args("printf", "%f needs a number"))?;
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), value));
            }
            'q' => out.push_str(&format!("{:?}", to_text(arg))),
            other => out.push_str(&format!("%!{other}({})", to_text(arg))),
        }
    }

    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, TemplateError> {
        let functions = Functions::new(Regexes::default());
        let function = functions.get(name).unwrap();
        function(args)
    }

    #[test]
    fn test_pattern_functions() {
        assert_eq!(call("match", &[json!("^a"), json!("abc")]), Ok(json!(true)));
        assert_eq!(call("matchP", &[json!("^b"), json!("abc")]), Ok(json!(false)));
        assert_eq!(
            call("replaceP", &[json!("-"), json!("a-b-c"), json!("_")]),
            Ok(json!("a_b_c"))
        );
        assert_eq!(
            call("findP", &[json!(r"(\d+)%"), json!("load 42%"), json!(1)]),
            Ok(json!("42"))
        );
    }

    #[test]
    fn test_pattern_functions_never_fail_on_bad_patterns() {
        assert_eq!(call("match", &[json!("("), json!("(")]), Ok(json!(false)));
        assert_eq!(call("findP", &[json!("["), json!("x"), json!(0)]), Ok(json!("")));
        assert_eq!(call("findP", &[json!("x"), json!("x"), json!(-1)]), Ok(json!("")));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(call("eq", &[json!(1), json!(1.0)]), Ok(json!(true)));
        assert_eq!(call("eq", &[json!("a"), json!("b"), json!("a")]), Ok(json!(true)));
        assert_eq!(call("ne", &[json!("a"), json!("b")]), Ok(json!(true)));
        assert_eq!(call("lt", &[json!(1), json!(2)]), Ok(json!(true)));
        assert_eq!(call("ge", &[json!("b"), json!("a")]), Ok(json!(true)));
        assert!(call("lt", &[json!("a"), json!(1)]).is_err());
        assert!(call("eq", &[json!(1)]).is_err());
    }

    #[test]
    fn test_logic() {
        assert_eq!(call("and", &[json!(1), json!(""), json!(2)]), Ok(json!("")));
        assert_eq!(call("and", &[json!(1), json!(2)]), Ok(json!(2)));
        assert_eq!(call("or", &[json!(""), json!("x")]), Ok(json!("x")));
        assert_eq!(call("not", &[json!(0)]), Ok(json!(true)));
    }

    #[test]
    fn test_round() {
        assert_eq!(call("round", &[json!(45.678), json!(2)]), Ok(json!(45.68)));
        assert_eq!(call("round", &[json!(45.5), json!(0)]), Ok(json!(46.0)));
        assert!(call("round", &[json!("abc"), json!(2)]).is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(call("upper", &[json!("bash")]), Ok(json!("BASH")));
        assert_eq!(call("trim", &[json!("  x ")]), Ok(json!("x")));
        assert_eq!(call("contains", &[json!("ell"), json!("hello")]), Ok(json!(true)));
        assert_eq!(call("hasPrefix", &[json!("he"), json!("hello")]), Ok(json!(true)));
        assert_eq!(call("len", &[json!([1, 2, 3])]), Ok(json!(3)));
        assert!(call("len", &[json!(3)]).is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(call("default", &[json!("none"), json!("")]), Ok(json!("none")));
        assert_eq!(call("default", &[json!("none"), json!("set")]), Ok(json!("set")));
    }

    #[test]
    fn test_printf() {
        assert_eq!(
            call("printf", &[json!("%s is %d%%"), json!("load"), json!(42)]),
            Ok(json!("load is 42%"))
        );
        assert_eq!(call("printf", &[json!("%.1f"), json!(3.14159)]), Ok(json!("3.1")));
        assert_eq!(call("printf", &[json!("%v %v"), json!(1)]), Ok(json!("1 %!v(MISSING)")));
    }

    #[test]
    fn test_arity_errors() {
        assert_eq!(
            call("upper", &[]),
            Err(TemplateError::bad_args("upper", "want 1 arguments, got 0"))
        );
    }
}
