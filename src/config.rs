use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::combs::DEFAULT_COMB_MARKER;
use crate::extract::ExtractorRegistry;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Sources in priority order: base species source first, then addons,
    /// then config-driven sources.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Pipeline-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_intermediate_dir")]
    pub intermediate_dir: PathBuf,
    pub override_path: Option<PathBuf>,
    #[serde(default = "default_comb_marker")]
    pub comb_marker: String,
    /// Also write the shortest-path mutation file.
    #[serde(default = "default_shortest_path")]
    pub shortest_path: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            intermediate_dir: default_intermediate_dir(),
            override_path: None,
            comb_marker: default_comb_marker(),
            shortest_path: default_shortest_path(),
            log_level: default_log_level(),
        }
    }
}

/// One input source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Extractor dialect (`enum`, `cfg`, `intermediate`).
    pub dialect: String,
    /// Namespace of the keys this source declares. Defaults to the name.
    pub namespace: Option<String>,
    /// Source file, or a directory of files for the `intermediate` dialect.
    pub path: PathBuf,
    /// Optional localized-name file.
    pub lang: Option<PathBuf>,
}

impl SourceConfig {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_intermediate_dir() -> PathBuf {
    PathBuf::from("data/intermediate")
}

fn default_comb_marker() -> String {
    DEFAULT_COMB_MARKER.to_string()
}

fn default_shortest_path() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in BEEGRAPH_CONFIG environment variable
    /// 2. ./beegraph.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("BEEGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("beegraph.toml"));

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. Relative paths inside the
    /// file are resolved against the file's directory.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);

        config.validate()?;

        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.pipeline.output_dir);
        join(&mut self.pipeline.intermediate_dir);
        if let Some(p) = self.pipeline.override_path.as_mut() {
            join(p);
        }
        for source in &mut self.sources {
            join(&mut source.path);
            if let Some(p) = source.lang.as_mut() {
                join(p);
            }
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("No [[sources]] configured. Add at least one source to the config file.");
        }

        let registry = ExtractorRegistry::new();
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                anyhow::bail!("sources.name must not be empty");
            }
            if !names.insert(source.name.as_str()) {
                anyhow::bail!("Duplicate source name: {}", source.name);
            }
            if registry.find(&source.dialect).is_none() {
                anyhow::bail!(
                    "Unknown dialect '{}' for source {} (expected one of: {})",
                    source.dialect,
                    source.name,
                    registry.dialects().join(", ")
                );
            }
        }

        if self.pipeline.comb_marker.trim().is_empty() {
            anyhow::bail!("pipeline.comb_marker must not be empty");
        }

        Ok(())
    }

    /// Sources to process, in priority order, optionally restricted to `only`.
    pub fn selected_sources(&self, only: &[String]) -> Vec<&SourceConfig> {
        self.sources
            .iter()
            .filter(|s| only.is_empty() || only.iter().any(|o| o == &s.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG: &str = r#"
[pipeline]
output_dir = "out"
override_path = "overrides.jsonc"
log_level = "debug"

[[sources]]
name = "forestry"
dialect = "enum"
path = "sources/Species.java"
lang = "sources/en_us.lang"

[[sources]]
name = "gendustry"
dialect = "cfg"
namespace = "gendustry"
path = "/abs/bees.cfg"
"#;

    fn write_config(temp_dir: &TempDir, content: &str) -> PathBuf {
        let path = temp_dir.path().join("beegraph.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_load_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, CONFIG);
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pipeline.log_level, "debug");
        assert_eq!(config.pipeline.comb_marker, "comb");
        assert!(config.pipeline.shortest_path);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].namespace(), "forestry");
    }

    #[test]
    fn test_relative_paths_resolved() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, CONFIG);
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pipeline.output_dir, temp_dir.path().join("out"));
        assert_eq!(config.sources[0].path, temp_dir.path().join("sources/Species.java"));
        assert_eq!(config.sources[1].path, PathBuf::from("/abs/bees.cfg"));
        assert_eq!(
            config.pipeline.intermediate_dir,
            temp_dir.path().join("data/intermediate")
        );
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(
            &temp_dir,
            "[[sources]]\nname = \"x\"\ndialect = \"xml\"\npath = \"x.xml\"\n",
        );
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown dialect"));
    }

    #[test]
    fn test_duplicate_and_empty_sources_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let dup = "[[sources]]\nname = \"x\"\ndialect = \"cfg\"\npath = \"a\"\n\
                   [[sources]]\nname = \"x\"\ndialect = \"cfg\"\npath = \"b\"\n";
        let path = write_config(&temp_dir, dup);
        assert!(Config::load_from(&path).unwrap_err().to_string().contains("Duplicate"));

        let path = write_config(&temp_dir, "[pipeline]\n");
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_selected_sources() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, CONFIG);
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.selected_sources(&[]).len(), 2);
        let only = config.selected_sources(&["gendustry".to_string()]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].name, "gendustry");
    }

    #[test]
    fn test_config_load_from_env_var() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, CONFIG);
        let original = std::env::var("BEEGRAPH_CONFIG").ok();
        std::env::set_var("BEEGRAPH_CONFIG", &path);
        let config = Config::load();
        std::env::remove_var("BEEGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("BEEGRAPH_CONFIG", v);
        }
        assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("BEEGRAPH_CONFIG").ok();
        std::env::set_var("BEEGRAPH_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("BEEGRAPH_CONFIG");
        if let Some(v) = original {
            std::env::set_var("BEEGRAPH_CONFIG", v);
        }
    }
}
