//! Configuration for medalforge.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MEDALFORGE_OUTPUT_DIR, MEDALFORGE_MODEL, GEMINI_API_KEY)
//! 2. Config file (.medalforge/config.yaml)
//! 3. Defaults (~/.medalforge/outputs)
//!
//! Config file discovery:
//! - Searches current directory and parents for .medalforge/config.yaml
//! - Paths in config file are relative to the project root (the parent of .medalforge/)
//!
//! Nothing here is global: the resolved configuration is handed to the
//! pipeline constructor, so several configurations can coexist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::adapters::GeminiConfig;
use crate::core::aggregator::DEFAULT_ACCESS_URL_TEMPLATE;
use crate::core::timeout::IMAGE_CALL_TIMEOUT;

/// Environment variable overriding the output root
pub const ENV_OUTPUT_DIR: &str = "MEDALFORGE_OUTPUT_DIR";

/// Environment variable overriding the model
pub const ENV_MODEL: &str = "MEDALFORGE_MODEL";

/// Default environment variable holding the provider key
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Upper bound on propositions per run
pub const MAX_PROPOSITIONS: u32 = 12;

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Number of propositions per run, 1..=MAX_PROPOSITIONS (default: 3)
    #[serde(default = "default_propositions")]
    pub propositions_count: u32,

    /// Per-call timeout in milliseconds (default: 120000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between remote calls in milliseconds (default: 2000)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Prefix of generated file names
    #[serde(default = "default_product_category")]
    pub product_category: String,

    /// Maximum number of reference images per request (default: 3)
    #[serde(default = "default_max_reference_images")]
    pub max_reference_images: usize,

    /// Template for artifact URLs, with {output_id} and {file_name}
    #[serde(default = "default_access_url_template")]
    pub access_url_template: String,
}

fn default_propositions() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    IMAGE_CALL_TIMEOUT.as_millis() as u64
}
fn default_delay_ms() -> u64 {
    2_000
}
fn default_product_category() -> String {
    "medaille".to_string()
}
fn default_max_reference_images() -> usize {
    3
}
fn default_access_url_template() -> String {
    DEFAULT_ACCESS_URL_TEMPLATE.to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            propositions_count: default_propositions(),
            timeout_ms: default_timeout_ms(),
            delay_ms: default_delay_ms(),
            product_category: default_product_category(),
            max_reference_images: default_max_reference_images(),
            access_url_template: default_access_url_template(),
        }
    }
}

impl GeneratorConfig {
    /// Units planned for one run (two views per proposition)
    pub fn total_units(&self) -> u32 {
        self.propositions_count.saturating_mul(2)
    }

    /// Check settings that cannot be expressed by their types
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PROPOSITIONS).contains(&self.propositions_count) {
            anyhow::bail!(
                "propositions_count must be between 1 and {}, got {}",
                MAX_PROPOSITIONS,
                self.propositions_count
            );
        }
        Ok(())
    }

    /// Timeout applied to each remote call
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pause between two remote calls
    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub generation: Option<GeneratorConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Output root (relative to the project root)
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Name of the environment variable holding the key
    pub api_key_env: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Pipeline settings
    pub generator: GeneratorConfig,
    /// Absolute path to the output root
    pub output_dir: PathBuf,
    /// Model identifier
    pub model: String,
    /// API root
    pub base_url: String,
    /// Environment variable the key is read from
    pub api_key_env: String,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Build the provider configuration, reading the key from the environment
    pub fn gemini(&self) -> Result<GeminiConfig> {
        let api_key = std::env::var(&self.api_key_env)
            .with_context(|| format!("{} is not set", self.api_key_env))?;

        Ok(GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        })
    }
}

/// Find config file by searching a directory and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".medalforge").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Default output root (~/.medalforge/outputs)
fn default_output_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".medalforge")
        .join("outputs"))
}

/// Resolve configuration starting the file search at `start`
pub fn load_config_from(start: &Path) -> Result<ResolvedConfig> {
    let config_file = find_config_file(start);

    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Project root is the parent of .medalforge/
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let generator = file
        .as_ref()
        .and_then(|f| f.generation.clone())
        .unwrap_or_default();
    generator
        .validate()
        .context("Invalid generation settings in config file")?;

    let output_dir = if let Ok(env_dir) = std::env::var(ENV_OUTPUT_DIR) {
        PathBuf::from(env_dir)
    } else if let Some(dir) = file.as_ref().and_then(|f| f.storage.output_dir.as_deref()) {
        resolve_path(&base_dir, dir)
    } else {
        default_output_dir()?
    };

    let provider = file.map(|f| f.provider).unwrap_or_default();

    let model = std::env::var(ENV_MODEL)
        .ok()
        .or(provider.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    Ok(ResolvedConfig {
        generator,
        output_dir,
        model,
        base_url: provider
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        api_key_env: provider
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        config_file,
    })
}

/// Resolve configuration from the current directory
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(root: &Path, body: &str) -> PathBuf {
        let dir = root.join(".medalforge");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", body).unwrap();
        path
    }

    #[test]
    fn test_generator_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.propositions_count, 3);
        assert_eq!(config.total_units(), 6);
        assert_eq!(config.call_timeout(), Duration::from_millis(120_000));
        assert_eq!(config.inter_call_delay(), Duration::from_millis(2_000));
        assert_eq!(config.max_reference_images, 3);
    }

    #[test]
    fn test_proposition_bounds() {
        let huge = GeneratorConfig {
            propositions_count: u32::MAX / 2 + 1,
            ..Default::default()
        };
        assert_eq!(huge.total_units(), u32::MAX);
        assert!(huge.validate().is_err());

        let none = GeneratorConfig {
            propositions_count: 0,
            ..Default::default()
        };
        assert!(none.validate().is_err());

        let max = GeneratorConfig {
            propositions_count: MAX_PROPOSITIONS,
            ..Default::default()
        };
        assert!(max.validate().is_ok());
        assert_eq!(max.total_units(), MAX_PROPOSITIONS * 2);
    }

    #[test]
    fn test_out_of_range_file_setting_rejected() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"
version: "1.0"
generation:
  propositions_count: 2147483648
"#,
        );

        assert!(load_config_from(temp.path()).is_err());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1.0"
generation:
  propositions_count: 2
  timeout_ms: 5000
  product_category: trophee
storage:
  output_dir: ./renders
provider:
  model: custom-image-model
  api_key_env: MY_KEY
"#,
        );

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.version, "1.0");

        let generation = config.generation.unwrap();
        assert_eq!(generation.propositions_count, 2);
        assert_eq!(generation.timeout_ms, 5000);
        assert_eq!(generation.product_category, "trophee");
        // Unset fields keep their defaults
        assert_eq!(generation.delay_ms, 2000);
        assert_eq!(config.storage.output_dir, Some("./renders".to_string()));
        assert_eq!(config.provider.api_key_env, Some("MY_KEY".to_string()));
    }

    #[test]
    fn test_discovery_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1.0"
provider:
  model: from-file
"#,
        );
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_file(&nested), Some(path));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "renders"),
            PathBuf::from("/home/user/project/renders")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
