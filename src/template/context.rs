//! Values every template can reach without being handed them explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::cache::CacheService;
use crate::runtime::{self, Environment};

/// Session key the render context is saved under.
pub const CACHE_KEY: &str = "template_cache";

/// Render context shared by every segment in one process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Context {
    pub shell: String,
    #[serde(rename = "PWD")]
    pub pwd: String,
    pub folder: String,
    pub user_name: String,
    pub host_name: String,
    /// Process environment. Never persisted.
    #[serde(skip)]
    pub env: HashMap<String, String>,
    pub var: HashMap<String, Value>,
    pub maps: HashMap<String, HashMap<String, String>>,
}

impl Context {
    pub fn new(
        env: &dyn Environment,
        var: HashMap<String, Value>,
        maps: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        let host_name = env.host().unwrap_or_else(|e| {
            debug!("Host name unavailable: {}", e);
            String::new()
        });

        Self {
            shell: env.shell().to_string(),
            pwd: env.pwd().to_string(),
            folder: runtime::base(env.pwd()).to_string(),
            user_name: env.user(),
            host_name,
            env: env.environ(),
            var,
            maps,
        }
    }

    /// Build the context, reusing the user and host names saved by an earlier
    /// run of the same session.
    ///
    /// Shell, working directory, environment, variables and maps always come
    /// from the current process.
    pub fn restore(
        cache: &CacheService,
        env: &dyn Environment,
        var: HashMap<String, Value>,
        maps: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        let Some(saved) = cache.session().get::<Context>(CACHE_KEY) else {
            return Self::new(env, var, maps);
        };
        debug!("Restored template context for {}", saved.user_name);

        Self {
            shell: env.shell().to_string(),
            pwd: env.pwd().to_string(),
            folder: runtime::base(env.pwd()).to_string(),
            user_name: saved.user_name,
            host_name: saved.host_name,
            env: env.environ(),
            var,
            maps,
        }
    }

    /// The values templates see as `.Shell`, `.Env.HOME`, `.Var.name` and so on.
    pub fn globals(&self) -> Value {
        let env: Map<String, Value> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        json!({
            "Shell": self.shell,
            "PWD": self.pwd,
            "Folder": self.folder,
            "UserName": self.user_name,
            "HostName": self.host_name,
            "Env": env,
            "Var": self.var,
            "Maps": self.maps,
        })
    }
}
