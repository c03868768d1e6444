//! Configuração do cliente carregada a partir de `metafold.toml`.
//!
//! A struct [`MetafoldConfig`] contém as credenciais, o projeto alvo e o
//! comportamento de polling dos jobs. Valores ausentes no arquivo usam
//! defaults sensíveis. As variáveis de ambiente `METAFOLD_ACCESS_TOKEN` e
//! `METAFOLD_PROJECT_ID` têm precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::api::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::jobs::PollConfig;

const CONFIG_FILE: &str = "metafold.toml";

/// Configuração de nível superior carregada de `metafold.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetafoldConfig {
    /// Chave secreta da API Metafold.
    #[serde(default)]
    pub access_token: String,

    /// ID do projeto contra o qual as chamadas são feitas.
    #[serde(default)]
    pub project_id: String,

    /// URL da API. Sobrescrita apenas em testes internos.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout total, em segundos, das chamadas JSON. Uploads multipart não
    /// são limitados por ele.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Intervalo, backoff e prazo do polling de jobs (tabela `[poll]`).
    #[serde(default)]
    pub poll: PollConfig,
}

// Valor padrão para a URL da API.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl Default for MetafoldConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            project_id: String::new(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll: PollConfig::default(),
        }
    }
}

impl MetafoldConfig {
    /// Carrega a configuração de `metafold.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<MetafoldConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    // Variáveis de ambiente não vazias têm precedência sobre o arquivo.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("METAFOLD_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.access_token = token;
        }
        if let Some(project) = lookup("METAFOLD_PROJECT_ID").filter(|v| !v.is_empty()) {
            self.project_id = project;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = MetafoldConfig::default();
        assert_eq!(config.base_url, "https://api.metafold3d.com");
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.backoff_factor, 1);
        assert_eq!(config.poll.timeout_ms, None);
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.access_token.is_empty());
        assert!(config.project_id.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            access_token = "mf-test-123"
            project_id = "42"
            request_timeout_secs = 30

            [poll]
            interval_ms = 250
            timeout_ms = 600000
        "#;
        let config: MetafoldConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.access_token, "mf-test-123");
        assert_eq!(config.project_id, "42");
        assert_eq!(config.base_url, "https://api.metafold3d.com");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.poll.timeout_ms, Some(600_000));
        assert_eq!(config.poll.max_interval_ms, 30_000);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: MetafoldConfig = toml::from_str(r#"access_token = "from-file""#).unwrap();
        config.apply_env(|key| match key {
            "METAFOLD_ACCESS_TOKEN" => Some("from-env".into()),
            "METAFOLD_PROJECT_ID" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.access_token, "from-env");
        assert!(config.project_id.is_empty());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metafold.toml");
        std::fs::write(&path, "project_id = \"7\"\nbase_url = \"http://localhost:8000\"\n").unwrap();
        let config = MetafoldConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.poll, PollConfig::default());
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metafold.toml");
        std::fs::write(&path, "poll = 3").unwrap();
        let err = MetafoldConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MetafoldConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.poll.interval_ms, 1000);
    }
}
