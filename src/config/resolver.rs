//! Resolução da conexão ativa com o Bitrix24
//!
//! Ordem de precedência (a primeira que responder vence):
//!
//! 1. URL de webhook vinda do cofre de segredos (quando `use_secret` está ligado)
//! 2. Conexão guardada na sessão deste processo
//! 3. Arquivo em disco (conta + tipo de API; ainda falta o token)
//! 4. Nada: o front-end deve mostrar o formulário

use super::cache_file::{CachedConnection, ConnectionCacheFile};
use bitrix::{parse_webhook_url, ApiVariant, ConnectionConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;

static ACCOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("static regex"));

/// De onde veio a conexão resolvida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionSource {
    SecretStore,
    Session,
    DiskCache,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready {
        config: ConnectionConfig,
        source: ConnectionSource,
    },
    /// Só o arquivo em disco existe: conta e tipo conhecidos, token não
    NeedsToken(CachedConnection),
    Unconfigured,
}

impl Resolution {
    pub fn config(&self) -> Option<&ConnectionConfig> {
        match self {
            Resolution::Ready { config, .. } => Some(config),
            _ => None,
        }
    }
}

/// Corpo do formulário de configuração
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupForm {
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_type")]
    pub api_type: String,
    #[serde(default)]
    pub use_secret: Option<bool>,
}

fn default_api_type() -> String {
    ApiVariant::Rest.as_str().to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Preencha todos os campos para salvar a configuração.")]
    MissingFields,

    #[error("Nome de conta inválido: {0}")]
    InvalidAccount(String),

    #[error("Tipo de API desconhecido: {0} (use 'rest' ou 'biconnector')")]
    UnknownApiType(String),
}

/// Resultado de um formulário aceito
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub config: ConnectionConfig,
    /// `false` quando a gravação em disco foi pulada ou falhou
    pub persisted: bool,
}

#[derive(Debug)]
struct SessionState {
    config: Option<ConnectionConfig>,
    use_secret: bool,
}

pub struct ConnectionResolver {
    domain: String,
    secret_webhook: Option<String>,
    session: RwLock<SessionState>,
    cache_file: ConnectionCacheFile,
}

impl ConnectionResolver {
    pub fn new(
        domain: impl Into<String>,
        secret_webhook: Option<String>,
        cache_file: ConnectionCacheFile,
    ) -> Self {
        Self {
            domain: domain.into(),
            secret_webhook: secret_webhook.filter(|url| !url.trim().is_empty()),
            session: RwLock::new(SessionState {
                config: None,
                use_secret: true,
            }),
            cache_file,
        }
    }

    pub fn cache_file(&self) -> &ConnectionCacheFile {
        &self.cache_file
    }

    pub fn has_secret(&self) -> bool {
        self.secret_webhook.is_some()
    }

    pub fn use_secret(&self) -> bool {
        self.session.read().unwrap_or_else(|e| e.into_inner()).use_secret
    }

    pub fn set_use_secret(&self, enabled: bool) {
        self.session.write().unwrap_or_else(|e| e.into_inner()).use_secret = enabled;
    }

    /// Resolve a conexão ativa seguindo a ordem de precedência
    pub async fn resolve(&self) -> Resolution {
        let (session_config, use_secret) = {
            let session = self.session.read().unwrap_or_else(|e| e.into_inner());
            (session.config.clone(), session.use_secret)
        };

        if use_secret {
            if let Some(url) = &self.secret_webhook {
                match parse_webhook_url(url, &self.domain) {
                    Some(config) => {
                        return Resolution::Ready {
                            config,
                            source: ConnectionSource::SecretStore,
                        }
                    }
                    None => tracing::warn!(
                        "⚠️ URL de webhook do cofre não reconhecida: {}",
                        bitrix::redact_url(url)
                    ),
                }
            }
        }

        if let Some(config) = session_config {
            return Resolution::Ready {
                config,
                source: ConnectionSource::Session,
            };
        }

        match self.cache_file.load().await {
            Some(cached) => Resolution::NeedsToken(cached),
            None => Resolution::Unconfigured,
        }
    }

    /// Valida o formulário, guarda na sessão e tenta gravar em disco
    pub async fn submit_form(&self, form: &SetupForm) -> Result<SaveOutcome, SetupError> {
        let account_name = form.account_name.trim();
        let token = form.token.trim();

        if account_name.is_empty() || token.is_empty() {
            return Err(SetupError::MissingFields);
        }
        if !ACCOUNT_RE.is_match(account_name) {
            return Err(SetupError::InvalidAccount(account_name.to_string()));
        }
        let api_variant = ApiVariant::parse(&form.api_type)
            .ok_or_else(|| SetupError::UnknownApiType(form.api_type.clone()))?;

        let config = ConnectionConfig::with_domain(account_name, token, api_variant, self.domain.as_str());

        {
            let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
            session.config = Some(config.clone());
            if let Some(use_secret) = form.use_secret {
                session.use_secret = use_secret;
            }
        }

        let cached = CachedConnection {
            account_name: config.account_name.clone(),
            api_type: api_variant,
        };
        let persisted = match self.cache_file.save(&cached).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("⚠️ Configuração mantida só na sessão: {}", e);
                false
            }
        };

        tracing::info!(
            "✅ Conexão configurada: conta={}, api={}",
            config.account_name,
            api_variant
        );

        Ok(SaveOutcome { config, persisted })
    }

    /// Esquece a conexão: limpa a sessão e apaga o arquivo em disco
    pub async fn reset(&self) -> bool {
        self.session.write().unwrap_or_else(|e| e.into_inner()).config = None;

        match self.cache_file.remove().await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("⚠️ Não foi possível remover o arquivo de conexão: {}", e);
                false
            }
        }
    }
}
