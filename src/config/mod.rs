//! Configuration module for monline.
//!
//! Loads configuration from environment variables. Shells export these from
//! their init scripts. Defaults can also live in a fixed env file
//! (`MON_CONFIG_PATH`, or `<config home>/monline/monline.env`); exported
//! variables win over the file. The working directory is never consulted,
//! since the prompt runs in whatever directory the user is in.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::cache::{CacheConfig, CacheDuration, CacheLocation, Strategy};
use crate::runtime::Flags;
use crate::segments::{SegmentConfig, SegmentType};

const DEFAULT_SHELL: &str = "generic";
const DEFAULT_SEGMENTS: &str = "shell,path";
const DEFAULT_DEADLINE_MS: u64 = 150;

const TEMPLATE_PREFIX: &str = "MON_TEMPLATE_";
const VAR_PREFIX: &str = "MON_VAR_";
const MAP_PREFIX: &str = "MON_MAP_";

const CONFIG_FILE: &str = "monline.env";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub shell: String,
    pub session_id: String,
    pub pwd: String,

    // Cache
    pub cache_dir: PathBuf,
    pub cache: CacheConfig,

    /// Segments in render order.
    pub segments: Vec<SegmentConfig>,

    /// User variables, visible to templates as `.Var.<Name>`.
    pub vars: HashMap<String, Value>,
    /// Named lookup tables, visible to templates as `.Maps.<Name>.<key>`.
    pub maps: HashMap<String, HashMap<String, String>>,

    /// Budget for evaluating all segments.
    pub deadline: Duration,

    /// Write a trace log for this invocation.
    pub trace: bool,

    /// Problems found while loading, reported once logging is up.
    pub warnings: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let pwd = env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();

        Self::load(env::vars().collect(), &pwd)
    }

    /// Merge the env file under `process` and build the configuration.
    pub fn load(process: HashMap<String, String>, current_dir: &str) -> Self {
        let mut warnings = Vec::new();
        let mut vars = HashMap::new();

        if let Some(path) = env_file(&process) {
            match read_env_file(&path) {
                Ok(file) => vars.extend(file),
                Err(e) if e.not_found() => {}
                Err(e) => warnings.push(format!("Cannot read {}: {}", path.display(), e)),
            }
        }
        vars.extend(process);

        let mut config = Self::from_vars(vars, current_dir);
        warnings.append(&mut config.warnings);
        config.warnings = warnings;
        config
    }

    /// Build configuration from an explicit set of variables.
    ///
    /// `current_dir` is used when `MON_PWD` is not set.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>, current_dir: &str) -> Self {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let mut warnings = Vec::new();

        let session_id = get("MON_SESSION_ID")
            .or_else(|| get("POSH_SESSION_ID"))
            .map(str::to_string)
            .unwrap_or_else(|| std::process::id().to_string());

        let strategy = get("MON_CACHE_STRATEGY")
            .map(Strategy::parse)
            .unwrap_or_default();
        let duration = get("MON_CACHE_DURATION")
            .map(|raw| {
                CacheDuration::parse(raw).unwrap_or_else(|| {
                    warnings.push(format!("Invalid cache duration {raw:?}, using default"));
                    CacheDuration::default()
                })
            })
            .unwrap_or_default();

        let deadline = get("MON_DEADLINE_MS")
            .map(|raw| {
                raw.parse().unwrap_or_else(|_| {
                    warnings.push(format!("Invalid deadline {raw:?}, using default"));
                    DEFAULT_DEADLINE_MS
                })
            })
            .unwrap_or(DEFAULT_DEADLINE_MS);
        let segments = segments(
            get("MON_SEGMENTS").unwrap_or(DEFAULT_SEGMENTS),
            &vars,
            &mut warnings,
        );

        Self {
            shell: get("MON_SHELL").unwrap_or(DEFAULT_SHELL).to_string(),
            session_id,
            pwd: get("MON_PWD").unwrap_or(current_dir).to_string(),
            cache_dir: cache_dir(&get),
            cache: CacheConfig::default().duration(duration).strategy(strategy),
            segments,
            vars: prefixed(&vars, VAR_PREFIX)
                .map(|(name, value)| (name, Value::String(value.to_string())))
                .collect(),
            maps: prefixed(&vars, MAP_PREFIX)
                .map(|(name, value)| (name, parse_map(value)))
                .collect(),
            deadline: Duration::from_millis(deadline),
            trace: get("MON_TRACE").is_some(),
            warnings,
        }
    }

    pub fn cache_location(&self) -> CacheLocation {
        CacheLocation {
            dir: self.cache_dir.clone(),
            session_id: self.session_id.clone(),
            pwd: self.pwd.clone(),
        }
    }

    pub fn flags(&self, debug: bool) -> Flags {
        Flags {
            shell: self.shell.clone(),
            pwd: self.pwd.clone(),
            session_id: self.session_id.clone(),
            debug,
        }
    }
}

/// Where the env file lives: `MON_CONFIG_PATH`, then the XDG config home,
/// then `~/.config`.
pub fn env_file(vars: &HashMap<String, String>) -> Option<PathBuf> {
    let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(path) = get("MON_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    if let Some(xdg) = get("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("monline").join(CONFIG_FILE));
    }
    get("HOME")
        .or_else(|| get("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".config").join("monline").join(CONFIG_FILE))
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, dotenvy::Error> {
    dotenvy::from_path_iter(path)?.collect()
}

fn cache_dir<'a>(get: &impl Fn(&str) -> Option<&'a str>) -> PathBuf {
    if let Some(path) = get("MON_CACHE_PATH") {
        return PathBuf::from(path);
    }
    if let Some(xdg) = get("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join("monline");
    }
    if let Some(home) = get("HOME").or_else(|| get("USERPROFILE")) {
        return PathBuf::from(home).join(".cache").join("monline");
    }
    env::temp_dir().join("monline")
}

/// `type[:arg]` entries, each with its `MON_TEMPLATE_<TYPE>` override applied.
fn segments(
    list: &str,
    vars: &HashMap<String, String>,
    warnings: &mut Vec<String>,
) -> Vec<SegmentConfig> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let config = SegmentConfig::parse(entry);
            if config.is_none() {
                warnings.push(format!("Unknown segment {entry:?} ignored"));
            }
            config
        })
        .map(|mut config| {
            // Text segments carry their content as the template.
            if config.kind != SegmentType::Text {
                let key = format!("{TEMPLATE_PREFIX}{}", config.kind.name().to_uppercase());
                if let Some(template) = vars.get(&key) {
                    config.template = Some(template.clone());
                }
            }
            config
        })
        .collect()
}

/// Variables named `<prefix><NAME>`, keyed by `NAME`.
fn prefixed<'a>(
    vars: &'a HashMap<String, String>,
    prefix: &'a str,
) -> impl Iterator<Item = (String, &'a str)> + 'a {
    vars.iter().filter_map(move |(key, value)| {
        key.strip_prefix(prefix)
            .filter(|name| !name.is_empty())
            .map(|name| (name.to_string(), value.as_str()))
    })
}

/// `key=value,key=value`
fn parse_map(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
