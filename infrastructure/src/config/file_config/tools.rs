//! Tool source configuration from TOML (`[tools]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where tool descriptors come from and how they are invoked.
///
/// Command-line flags take precedence over these settings.
///
/// ```toml
/// [tools]
/// catalogs = ["tools.json", "extra-tools.json"]
/// fixtures = "fixtures.json"
/// base_url = "http://localhost:8080"
/// token_env = "CONDUCTOR_TOKEN"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// JSON catalog files; earlier files win name conflicts
    pub catalogs: Vec<PathBuf>,
    /// Canned responses for offline runs
    pub fixtures: Option<PathBuf>,
    /// Tool gateway for the HTTP invoker
    pub base_url: Option<String>,
    /// Environment variable holding the gateway's bearer token
    pub token_env: Option<String>,
}

impl FileToolsConfig {
    pub fn bearer_token(&self) -> Option<String> {
        self.token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|token| !token.is_empty())
    }
}
