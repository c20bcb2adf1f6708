use crate::config::settings::BitrixSettings;
use anyhow::Result;
use google_cloud_secretmanager_v1::client::SecretManagerService as GcpSecretClient;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Secret Manager client não disponível")]
    ClientNotAvailable,

    #[error("Falha ao acessar secret: {0}")]
    AccessError(String),

    #[error("Secret com conteúdo inválido: {0}")]
    DecodingError(String),

    #[error("Secret vazio: {0}")]
    Empty(String),
}

/// Fonte somente leitura da URL de webhook do Bitrix24
///
/// Em release tenta o Google Secret Manager; em qualquer modo cai para a
/// variável de ambiente configurada em `bitrix.webhook_env_var`.
pub struct SecretManagerService {
    client: Option<GcpSecretClient>,
    project_id: String,
    secret_name: String,
    env_var: String,
}

impl SecretManagerService {
    pub async fn new(settings: &BitrixSettings) -> Result<Self> {
        let project_id = Self::get_project_id();

        // Tenta criar o cliente do Secret Manager (apenas em produção)
        let client = if cfg!(debug_assertions) {
            tracing::debug!("Modo desenvolvimento: usando variáveis de ambiente");
            None
        } else {
            match GcpSecretClient::builder().build().await {
                Ok(client) => {
                    tracing::info!("Secret Manager client inicializado com sucesso");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!("Falha ao criar Secret Manager client: {}. Usando fallback para variáveis de ambiente.", e);
                    None
                }
            }
        };

        tracing::info!("Secret Manager Service inicializado para projeto: {}", project_id);

        Ok(Self {
            client,
            project_id,
            secret_name: settings.webhook_secret_name.clone(),
            env_var: settings.webhook_env_var.clone(),
        })
    }

    /// Sem cliente GCP: só a variável de ambiente
    pub fn env_only(settings: &BitrixSettings) -> Self {
        Self {
            client: None,
            project_id: Self::get_project_id(),
            secret_name: settings.webhook_secret_name.clone(),
            env_var: settings.webhook_env_var.clone(),
        }
    }

    fn get_project_id() -> String {
        env::var("GCP_PROJECT_ID")
            .or_else(|_| env::var("GOOGLE_CLOUD_PROJECT"))
            .unwrap_or_else(|_| "jusgestante".to_string())
    }

    /// URL completa do webhook, se alguma fonte tiver
    pub async fn get_bitrix_webhook_url(&self) -> Option<String> {
        match self.get_secret(&self.secret_name).await {
            Ok(url) => return Some(url),
            Err(SecretsError::ClientNotAvailable) => {}
            Err(e) => {
                tracing::warn!("{}. Tentando variável de ambiente.", e);
            }
        }

        match env::var(&self.env_var) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!("Usando {} da variável de ambiente", self.env_var);
                Some(url.trim().to_string())
            }
            _ => {
                tracing::debug!("Nenhuma URL de webhook configurada ({})", self.env_var);
                None
            }
        }
    }

    async fn get_secret(&self, secret_name: &str) -> Result<String, SecretsError> {
        let client = self.client.as_ref().ok_or(SecretsError::ClientNotAvailable)?;

        let full_secret_name = format!(
            "projects/{}/secrets/{}/versions/latest",
            self.project_id, secret_name
        );

        let response = client
            .access_secret_version()
            .set_name(full_secret_name)
            .send()
            .await
            .map_err(|e| SecretsError::AccessError(e.to_string()))?;

        let payload = response
            .payload
            .ok_or_else(|| SecretsError::Empty(secret_name.to_string()))?;
        let value = String::from_utf8(payload.data.to_vec())
            .map_err(|e| SecretsError::DecodingError(e.to_string()))?;

        if value.trim().is_empty() {
            return Err(SecretsError::Empty(secret_name.to_string()));
        }

        tracing::info!("Secret '{}' recuperado do Secret Manager", secret_name);
        Ok(value.trim().to_string())
    }
}
