// src/config/config.rs
use crate::types::{AlgorithmType, PowMode};
use crate::utils::error::FrkhashError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Engine configuration
///
/// Every field has a default, so an empty file is a valid configuration for
/// a normal-mode ethash engine mining on all cores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine mode (normal, shared, test, fake, fullfake)
    pub pow_mode: PowMode,

    /// Proof-of-work strategy (ethash, frankomoto)
    pub algorithm: AlgorithmType,

    /// Local mining threads
    /// (0 = one per CPU core, negative = no local mining)
    pub threads: i32,

    /// Endpoints notified whenever new remote work is issued
    pub notify: Vec<Url>,

    /// Post the complete header instead of the work array
    pub notify_full: bool,

    /// Accept remote solutions without verifying them
    pub noverify: bool,

    /// Number of cache epochs kept in memory
    #[serde(default = "default_caches_in_mem")]
    pub caches_in_mem: usize,

    /// Number of dataset epochs kept in memory
    #[serde(default = "default_datasets_in_mem")]
    pub datasets_in_mem: usize,

    /// Directory for cache dumps (none = never written to disk)
    pub cache_dir: Option<PathBuf>,

    /// Directory for dataset dumps (none = never written to disk)
    pub dataset_dir: Option<PathBuf>,
}

fn default_caches_in_mem() -> usize {
    2
}

fn default_datasets_in_mem() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pow_mode: PowMode::default(),
            algorithm: AlgorithmType::default(),
            threads: 0,
            notify: Vec::new(),
            notify_full: false,
            noverify: false,
            caches_in_mem: default_caches_in_mem(),
            datasets_in_mem: default_datasets_in_mem(),
            cache_dir: None,
            dataset_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(FrkhashError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FrkhashError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            FrkhashError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Config::parse(&config_str)
    }

    /// Parses configuration from TOML text
    pub fn parse(config_str: &str) -> Result<Self, FrkhashError> {
        let config: Config = toml::from_str(config_str)
            .map_err(|e| FrkhashError::ConfigError(format!("Invalid config format: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FrkhashError> {
        if self.pow_mode.is_real() && self.caches_in_mem == 0 {
            return Err(FrkhashError::ConfigError(
                "caches_in_mem must be at least 1".into(),
            ));
        }
        if let Some(url) = self.notify.iter().find(|u| !matches!(u.scheme(), "http" | "https")) {
            return Err(FrkhashError::ConfigError(format!(
                "Unsupported notification scheme: {}",
                url
            )));
        }
        Ok(())
    }

    /// Generates a configuration template string
    ///
    /// # Arguments
    /// * `notify` - Include an example notification endpoint
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template(notify: bool) -> String {
        let mut template = String::new();
        template.push_str("# frkhash engine configuration\n\n");
        template.push_str("# Engine mode: normal, shared, test, fake, fullfake\n");
        template.push_str("pow_mode = \"normal\"\n");
        template.push_str("# Proof-of-work strategy: ethash, frankomoto\n");
        template.push_str("algorithm = \"ethash\"\n");
        template.push_str("# Local mining threads (0 = auto-detect, -1 = remote only)\n");
        template.push_str("threads = 0\n\n");

        template.push_str("# Epochs kept in memory\n");
        template.push_str("caches_in_mem = 2\n");
        template.push_str("datasets_in_mem = 1\n");
        template.push_str("# Dump directories (omit to keep everything in memory)\n");
        template.push_str("# cache_dir = \"/var/lib/frkhash/cache\"\n");
        template.push_str("# dataset_dir = \"/var/lib/frkhash/dataset\"\n\n");

        template.push_str("# Skip verification of remote solutions\n");
        template.push_str("noverify = false\n");
        if notify {
            template.push_str("# Work notification endpoints\n");
            template.push_str("notify = [\"http://127.0.0.1:8888/work\"]\n");
            template.push_str("# Post the full header instead of the work array\n");
            template.push_str("notify_full = false\n");
        }

        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.caches_in_mem, 2);
        assert_eq!(config.datasets_in_mem, 1);
        assert_eq!(config.pow_mode, PowMode::Normal);
        assert_eq!(config.algorithm, AlgorithmType::Ethash);
    }

    #[test]
    fn templates_parse() {
        for notify in [false, true] {
            let config = Config::parse(&Config::generate_template(notify)).unwrap();
            assert_eq!(config.threads, 0);
            assert_eq!(config.notify.len(), usize::from(notify));
        }
    }

    #[test]
    fn parses_all_fields() {
        let config = Config::parse(
            r#"
            pow_mode = "test"
            algorithm = "frankomoto"
            threads = -1
            notify = ["http://localhost:1234/"]
            notify_full = true
            noverify = true
            caches_in_mem = 3
            datasets_in_mem = 0
            cache_dir = "/tmp/frk"
            "#,
        )
        .unwrap();
        assert_eq!(config.pow_mode, PowMode::Test);
        assert_eq!(config.algorithm, AlgorithmType::Frankomoto);
        assert_eq!(config.threads, -1);
        assert_eq!(config.notify[0].port(), Some(1234));
        assert!(config.notify_full && config.noverify);
        assert_eq!(config.caches_in_mem, 3);
        assert_eq!(config.datasets_in_mem, 0);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/frk")));
        assert_eq!(config.dataset_dir, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::parse("notify = [\"not a url\"]").is_err());
        assert!(Config::parse("notify = [\"ftp://example.com\"]").is_err());
        assert!(Config::parse("pow_mode = \"turbo\"").is_err());
        assert!(Config::parse("caches_in_mem = 0").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"threads = 4\n").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.threads, 4);

        let missing = Config::load("/nonexistent/frkhash.toml");
        assert!(matches!(missing, Err(FrkhashError::ConfigError(_))));
    }
}
