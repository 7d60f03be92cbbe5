use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, read once at startup. All endpoint paths
    /// are appended under `<base_url>/api/v1`.
    pub base_url: String,

    /// Per-request timeout. Absent means no timeout at all; a hung
    /// backend call hangs the command until cancelled.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CredentialsConfig {
    /// Where the token cache lives. Defaults to
    /// `<config dir>/ctxr/credentials.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_limit() -> i64 {
    10
}
fn default_similarity_threshold() -> f64 {
    0.5
}

impl CredentialsConfig {
    /// Resolve the credential cache path, applying the platform default
    /// when none is configured.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.path {
            return Ok(path.clone());
        }
        let base = dirs::config_dir().context("Could not determine a config directory")?;
        Ok(base.join("ctxr").join("credentials.json"))
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate api
    let base = config.api.base_url.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }
    if !base.starts_with("http://") && !base.starts_with("https://") {
        anyhow::bail!("api.base_url must start with http:// or https://");
    }
    config.api.base_url = base;

    // Validate retrieval
    if config.retrieval.limit < 1 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.retrieval.similarity_threshold) {
        anyhow::bail!("retrieval.similarity_threshold must be in [0.0, 1.0]");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_defaults() {
        let file = write_config("[api]\nbase_url = \"http://localhost:8001\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8001");
        assert_eq!(config.api.timeout_secs, None);
        assert_eq!(config.retrieval.limit, 10);
        assert!((config.retrieval.similarity_threshold - 0.5).abs() < f64::EPSILON);
        assert!(config.credentials.path.is_none());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let file = write_config("[api]\nbase_url = \"http://localhost:8001/\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8001");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let file = write_config("[api]\nbase_url = \"localhost:8001\"\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let file = write_config(
            "[api]\nbase_url = \"http://localhost:8001\"\n[retrieval]\nsimilarity_threshold = 1.5\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_zero_limit() {
        let file =
            write_config("[api]\nbase_url = \"http://localhost:8001\"\n[retrieval]\nlimit = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_explicit_credentials_path() {
        let file = write_config(
            "[api]\nbase_url = \"http://localhost:8001\"\n[credentials]\npath = \"/tmp/creds.json\"\n",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.credentials.resolved_path().unwrap(),
            PathBuf::from("/tmp/creds.json")
        );
    }
}
