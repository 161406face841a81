use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    /// Format tag stamped on documents created without an explicit one.
    /// Opaque to the engine.
    #[serde(default = "default_format")]
    pub default_format: String,
    /// History listing length when the caller gives no `limit`.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

fn default_history_limit() -> i64 {
    50
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.documents.default_format.is_empty() {
        anyhow::bail!("documents.default_format must not be empty");
    }

    if config.documents.history_limit < 1 {
        anyhow::bail!("documents.history_limit must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let file = write_config(
            r#"
[db]
path = "/tmp/cdoc.sqlite"

[server]
bind = "127.0.0.1:7410"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.documents.default_format, "markdown");
        assert_eq!(config.documents.history_limit, 50);
    }

    #[test]
    fn test_documents_overrides() {
        let file = write_config(
            r#"
[db]
path = "/tmp/cdoc.sqlite"

[server]
bind = "127.0.0.1:7410"

[documents]
default_format = "plain"
history_limit = 10
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.documents.default_format, "plain");
        assert_eq!(config.documents.history_limit, 10);
    }

    #[test]
    fn test_zero_history_limit_rejected() {
        let file = write_config(
            r#"
[db]
path = "/tmp/cdoc.sqlite"

[server]
bind = "127.0.0.1:7410"

[documents]
history_limit = 0
"#,
        );
        assert!(load_config(file.path()).is_err());
    }
}
