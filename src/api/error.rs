//! Tipos de erro do cliente da API Metafold.
//!
//! Define [`ApiError`], o único tipo de erro exposto pelo crate: falhas HTTP,
//! de rede, de parsing, de arquivos locais e as interrupções do loop de
//! polling. A falha de um job *não* é um erro; ela volta como dado em
//! [`JobState::Failure`](crate::jobs::JobState::Failure).

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Campos do corpo de erro consultados em ordem. As respostas de erro da API
/// não seguem um formato único.
const REASON_FIELDS: &[&str] = &["errors", "msg", "description"];

/// Erros que podem ocorrer ao interagir com a API Metafold.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A API respondeu com status fora da faixa 2xx.
    #[error("HTTP error occurred: {reason}")]
    Http { status: StatusCode, reason: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout do socket).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Corpo de resposta com formato inesperado.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Leitura ou escrita de arquivo local (upload/download).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// O token de acesso não pode ser usado como valor de cabeçalho.
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    /// O job foi aceito sem estado terminal e sem `link` de status.
    #[error("job {job_id} was accepted without a status link")]
    MissingPollLocation { job_id: String },

    #[error("asset {asset_id} download response has no link")]
    MissingDownloadLink { asset_id: String },

    /// O chamador cancelou o polling.
    #[error("polling of job {job_id} cancelled after {polls} polls")]
    Cancelled { job_id: String, polls: u32 },

    /// O prazo configurado em `PollConfig::timeout_ms` expirou.
    #[error("job {job_id} not finished after {polls} polls, deadline exceeded")]
    DeadlineExceeded { job_id: String, polls: u32 },
}

impl ApiError {
    /// Constrói um [`ApiError::Http`] a partir do status e do corpo bruto da
    /// resposta, extraindo o motivo mais informativo disponível.
    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let reason = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|json| extract_reason(&json))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        ApiError::Http { status, reason }
    }

    /// Status HTTP, quando o erro veio de uma resposta.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(err) => err.status(),
            _ => None,
        }
    }
}

/// Primeiro campo candidato com valor não vazio. Strings são usadas como
/// estão; outros valores JSON são renderizados de forma compacta.
fn extract_reason(body: &Value) -> Option<String> {
    REASON_FIELDS
        .iter()
        .filter_map(|field| body.get(field))
        .find(|value| !is_empty(value))
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
