//! Tipos de erro para o crate bitrix

use thiserror::Error;

/// Erros de acesso ao Bitrix24
#[derive(Debug, Error)]
pub enum BitrixError {
    /// Erro de transporte (DNS, conexão, timeout)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Status HTTP diferente de 200
    #[error("Bitrix24 API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Resposta 200 contendo um objeto com chave `error`
    #[error("Bitrix24 returned an error payload: {0}")]
    ErrorPayload(String),

    /// JSON inválido
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// JSON válido mas fora dos formatos suportados
    #[error("Unsupported payload shape: {0}")]
    ShapeMismatch(String),

    /// Erro de configuração (cliente HTTP, URL de webhook)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BitrixError {
    /// Código HTTP associado, quando houver
    pub fn status(&self) -> Option<u16> {
        match self {
            BitrixError::ApiError { status, .. } => Some(*status),
            BitrixError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, BitrixError>;
