//! Configuration schema for tuxcache
//!
//! Configuration is stored at `~/.config/tuxcache/config.toml`. Every field
//! has a default, so the file is optional in CI.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Repository holding the cache variables
    pub github: GithubConfig,

    /// Fingerprint inputs
    pub fingerprint: FingerprintConfig,

    /// Build batch results
    pub results: ResultsConfig,
}

impl Config {
    /// Check values that parse but cannot work
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got {:?}",
                self.general.log_format
            ));
        }
        if !(self.github.api_url.starts_with("https://") || self.github.api_url.starts_with("http://")) {
            return Err(format!("github.api_url is not an http(s) URL: {}", self.github.api_url));
        }
        if self.github.owner.is_empty() || self.github.repo.is_empty() {
            return Err("github.owner and github.repo must not be empty".to_string());
        }
        if self.github.timeout_secs == 0 {
            return Err("github.timeout_secs must be at least 1".to_string());
        }
        if self.results.env_var.is_empty() {
            return Err("results.env_var must not be empty".to_string());
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// GitHub repository variables API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL (for GitHub Enterprise)
    pub api_url: String,

    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Value of the X-GitHub-Api-Version header
    pub api_version: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: "ClangBuiltLinux".to_string(),
            repo: "continuous-integration2".to_string(),
            api_version: "2022-11-28".to_string(),
            timeout_secs: 64,
        }
    }
}

/// Where fingerprint inputs come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// git executable used for ls-remote
    pub git: String,

    /// Compiler whose `--version` identifies the toolchain
    pub compiler: String,

    /// Directory holding one patch series directory per tree
    pub patches_dir: PathBuf,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            compiler: "clang".to_string(),
            patches_dir: PathBuf::from("patches"),
        }
    }
}

/// Build batch result settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Batch summary written by Tuxsuite
    pub builds_file: PathBuf,

    /// Prefix of the batch file in mock mode
    pub mock_prefix: String,

    /// Variable written to `$GITHUB_ENV` on a cache hit
    pub env_var: String,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            builds_file: PathBuf::from("builds.json"),
            mock_prefix: "mock.".to_string(),
            env_var: "CACHE_PASS".to_string(),
        }
    }
}

impl ResultsConfig {
    /// Batch file to read, honouring mock mode
    pub fn builds_path(&self, mock: bool) -> PathBuf {
        if !mock {
            return self.builds_file.clone();
        }

        let name = self
            .builds_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.builds_file
            .with_file_name(format!("{}{}", self.mock_prefix, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[github]"));
        assert!(toml.contains("[fingerprint]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.github.owner, "ClangBuiltLinux");
        assert_eq!(config.github.timeout_secs, 64);
        assert_eq!(config.fingerprint.compiler, "clang");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [github]
            repo = "ci-staging"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.github.repo, "ci-staging");
        assert_eq!(config.github.owner, "ClangBuiltLinux"); // default preserved
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn unusable_values_fail_validation() {
        let mut config = Config::default();
        config.general.log_format = "yaml".to_string();
        assert!(config.validate().unwrap_err().contains("log_format"));

        let mut config = Config::default();
        config.github.api_url = "api.github.com".to_string();
        assert!(config.validate().unwrap_err().contains("api_url"));

        let mut config = Config::default();
        config.github.repo = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn builds_path_in_mock_mode() {
        let results = ResultsConfig::default();
        assert_eq!(results.builds_path(false), PathBuf::from("builds.json"));
        assert_eq!(results.builds_path(true), PathBuf::from("mock.builds.json"));

        let nested = ResultsConfig {
            builds_file: PathBuf::from("out/builds.json"),
            ..ResultsConfig::default()
        };
        assert_eq!(nested.builds_path(true), PathBuf::from("out/mock.builds.json"));
    }
}
