//! Arquivo de cache da conexão
//!
//! Guarda somente conta e tipo de API, editável à mão. O token nunca vai
//! para o disco: quem carrega este arquivo ainda precisa pedir o token.

use bitrix::ApiVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Conteúdo persistido
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedConnection {
    pub account_name: String,
    pub api_type: ApiVariant,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache em disco desabilitado (hospedagem somente leitura)")]
    ReadOnly,

    #[error("falha de E/S em {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("falha ao serializar cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ConnectionCacheFile {
    path: PathBuf,
    read_only: bool,
}

impl ConnectionCacheFile {
    pub fn new(path: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            path: path.into(),
            read_only,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Lê o cache; arquivo ausente, malformado ou sem conta resulta em `None`
    pub async fn load(&self) -> Option<CachedConnection> {
        let content = tokio::fs::read_to_string(&self.path).await.ok()?;

        match serde_json::from_str::<CachedConnection>(&content) {
            Ok(cached) if !cached.account_name.trim().is_empty() => Some(cached),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Cache de conexão ignorado ({}): {}", self.path.display(), e);
                None
            }
        }
    }

    /// Grava conta + tipo de API
    pub async fn save(&self, cached: &CachedConnection) -> Result<(), CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let content = serde_json::to_string_pretty(cached)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| self.io_error(source))
    }

    /// Remove o arquivo; retorna `true` se havia algo para remover
    pub async fn remove(&self) -> Result<bool, CacheError> {
        if self.read_only {
            return Err(CacheError::ReadOnly);
        }

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
