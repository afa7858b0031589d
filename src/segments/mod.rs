//! Segments - the pieces a prompt is assembled from.
//!
//! Every segment follows the same protocol: the engine calls
//! [`Segment::enabled`] once, and only if it returned `true` renders
//! [`Segment::template`] against [`Segment::data`]. Shared behaviour lives in
//! [`Base`], which each variant embeds.

mod battery;
mod command;
mod path;
mod shell;
mod sysinfo;
mod text;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use battery::Battery;
pub use command::Command;
pub use path::Path;
pub use shell::Shell;
pub use sysinfo::SysInfo;
pub use text::Text;

use crate::runtime::Environment;

/// A prompt segment.
pub trait Segment: Send {
    fn kind(&self) -> SegmentType;

    /// Probe the environment and resolve the data the template needs.
    fn enabled(&mut self) -> bool;

    /// Template source; the configured override or the segment default.
    fn template(&self) -> &str;

    /// Data the template is rendered against.
    fn data(&self) -> Value;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentType {
    Battery,
    Command,
    Path,
    Shell,
    SysInfo,
    Text,
}

impl SegmentType {
    pub const ALL: [SegmentType; 6] = [
        Self::Battery,
        Self::Command,
        Self::Path,
        Self::Shell,
        Self::SysInfo,
        Self::Text,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "battery" => Some(Self::Battery),
            "command" => Some(Self::Command),
            "path" => Some(Self::Path),
            "shell" => Some(Self::Shell),
            "sysinfo" => Some(Self::SysInfo),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Command => "command",
            Self::Path => "path",
            Self::Shell => "shell",
            Self::SysInfo => "sysinfo",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Free-form segment options with typed getters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(HashMap<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Integer option. Numeric strings are accepted.
    pub fn int(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}

/// One configured segment, before it is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    pub kind: SegmentType,
    pub template: Option<String>,
    pub options: Options,
}

impl SegmentConfig {
    pub fn new(kind: SegmentType) -> Self {
        Self {
            kind,
            template: None,
            options: Options::new(),
        }
    }

    /// Parse a `type[:arg]` entry.
    ///
    /// The argument is the command to look up for `command` segments and the
    /// text itself for `text` segments. Other segments ignore it.
    pub fn parse(entry: &str) -> Option<Self> {
        let (kind, arg) = match entry.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg.trim())),
            None => (entry, None),
        };
        let mut config = Self::new(SegmentType::parse(kind)?);

        match (config.kind, arg) {
            (SegmentType::Command, Some(arg)) => config.options.insert(command::COMMAND, arg),
            (SegmentType::Text, Some(arg)) => config.template = Some(arg.to_string()),
            _ => {}
        }
        Some(config)
    }

    /// Instantiate the segment against `env`.
    pub fn build(&self, env: Arc<dyn Environment>) -> Box<dyn Segment> {
        let base = Base {
            options: self.options.clone(),
            env,
            template: self.template.clone(),
        };

        match self.kind {
            SegmentType::Battery => Box::new(Battery::new(base)),
            SegmentType::Command => Box::new(Command::new(base)),
            SegmentType::Path => Box::new(Path::new(base)),
            SegmentType::Shell => Box::new(Shell::new(base)),
            SegmentType::SysInfo => Box::new(SysInfo::new(base)),
            SegmentType::Text => Box::new(Text::new(base)),
        }
    }
}

/// State every segment carries.
pub struct Base {
    pub options: Options,
    pub env: Arc<dyn Environment>,
    template: Option<String>,
}

impl Base {
    pub fn new(options: Options, env: Arc<dyn Environment>) -> Self {
        Self {
            options,
            env,
            template: None,
        }
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// The configured template, or `default`.
    pub fn template<'a>(&'a self, default: &'a str) -> &'a str {
        self.template.as_deref().unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::runtime::mock::MockEnvironment;

    #[test]
    fn test_options() {
        let options = Options::new()
            .with("precision", 3)
            .with("as_string", "7")
            .with("name", "git")
            .with("flag", true);

        assert_eq!(options.int("precision", 2), 3);
        assert_eq!(options.int("as_string", 2), 7);
        assert_eq!(options.int("missing", 2), 2);
        assert_eq!(options.int("name", 2), 2);
        assert_eq!(options.string("name", ""), "git");
        assert_eq!(options.string("missing", "x"), "x");
        assert!(options.bool("flag", false));
        assert!(!options.bool("missing", false));
    }

    #[test]
    fn test_parse_entries() {
        let config = SegmentConfig::parse("command:git").unwrap();
        assert_eq!(config.kind, SegmentType::Command);
        assert_eq!(config.options.string(command::COMMAND, ""), "git");

        let config = SegmentConfig::parse("text:>>").unwrap();
        assert_eq!(config.template.as_deref(), Some(">>"));

        assert_eq!(
            SegmentConfig::parse(" SysInfo ").map(|c| c.kind),
            Some(SegmentType::SysInfo)
        );
        assert!(SegmentConfig::parse("weather").is_none());
    }

    #[test]
    fn test_type_names_round_trip() {
        for kind in SegmentType::ALL {
            assert_eq!(SegmentType::parse(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_build_uses_template_override() {
        let env: Arc<dyn Environment> = Arc::new(MockEnvironment::new("zsh", "/"));
        let mut config = SegmentConfig::new(SegmentType::Shell);
        config.template = Some("<{{ .Name }}>".to_string());

        let mut segment = config.build(env);
        assert_eq!(segment.kind(), SegmentType::Shell);
        assert!(segment.enabled());
        assert_eq!(segment.template(), "<{{ .Name }}>");
        assert_eq!(segment.data(), json!({"Name": "zsh"}));
    }
}
