//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["conductor.toml", ".conductor.toml"];
const ENV_PREFIX: &str = "CONDUCTOR_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `CONDUCTOR_*` environment variables (`__` separates sections,
    ///    e.g. `CONDUCTOR_ORCHESTRATOR__MAX_PARALLELISM=8`)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./conductor.toml` or `./.conductor.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/conductor/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        let project = Self::project_config_in(Path::new("."));
        Self::figment(Self::global_config_path(), project, config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// File layers without the environment
    fn figment(global: Option<PathBuf>, project: Option<PathBuf>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global) = global.filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(global));
        }
        if let Some(project) = project {
            figment = figment.merge(Toml::file(project));
        }
        // A missing explicit file is an error rather than silently ignored
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment
    }

    /// Get the global config file path
    ///
    /// `$XDG_CONFIG_HOME/conductor/config.toml` on Linux, the platform
    /// equivalent elsewhere.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("conductor").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources(explicit: Option<&Path>) {
        println!("Configuration sources (in priority order):");
        println!("  [  *  ] Env:      {}*", ENV_PREFIX);

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            println!("  [{:^5}] Explicit: {}", mark, path.display());
        }

        match Self::project_config_path() {
            Some(path) => println!("  [FOUND] Project:  {}", path.display()),
            None => println!("  [     ] Project:  ./conductor.toml or ./.conductor.toml"),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:   {}", mark, path.display());
        }

        println!("  [     ] Default:  built-in defaults");
    }
}
