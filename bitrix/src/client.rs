//! Cliente HTTP para o Bitrix24
//!
//! Uma requisição GET por chamada, sem retry. A credencial viaja na URL, por
//! isso todo log usa a versão mascarada.

use crate::connection::redact_url;
use crate::error::{BitrixError, Result};
use crate::payload::ParsedPayload;
use crate::table::Table;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Bytes do corpo exibidos no log de diagnóstico
const DIAGNOSTIC_PREVIEW_BYTES: usize = 500;

/// Cliente somente leitura do Bitrix24
#[derive(Clone, Debug)]
pub struct BitrixClient {
    http_client: HttpClient,
}

/// Resultado de [`BitrixClient::fetch_table`]: sempre uma tabela, com o erro ao lado
#[derive(Debug, Clone, Default)]
pub struct TableFetch {
    pub table: Table,
    /// Mensagem (já mascarada) quando a busca falhou
    pub error: Option<String>,
    /// Status HTTP da falha, quando houver
    pub status: Option<u16>,
}

impl TableFetch {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resposta bruta do teste de conexão
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// Corpo como JSON, quando for JSON
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

impl BitrixClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new() -> Result<Self> {
        Self::with_timeouts(30, 5)
    }

    /// Cria um novo cliente com timeouts customizados
    pub fn with_timeouts(total_timeout_secs: u64, connect_timeout_secs: u64) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(total_timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| BitrixError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// GET + parse JSON; status diferente de 200 é erro
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let safe_url = redact_url(url);
        tracing::debug!("GET {}", safe_url);

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!("Status {} de {}", status.as_u16(), safe_url);
        tracing::debug!("Primeiros bytes da resposta: {}", redact_url(body_preview(&body)));

        if status != StatusCode::OK {
            let message = redact_url(body_preview(&body));
            tracing::error!("Bitrix24 API error ({}): {}", status.as_u16(), message);
            return Err(BitrixError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Busca e normaliza uma tabela, propagando o erro
    pub async fn try_fetch_table(&self, url: &str) -> Result<Table> {
        let value = self.get_json(url).await?;
        let table = ParsedPayload::inspect(value).into_table()?;

        tracing::debug!(
            "Tabela normalizada com {} linhas e {} colunas",
            table.len(),
            table.columns().len()
        );

        Ok(table)
    }

    /// Busca e normaliza uma tabela sem nunca falhar
    ///
    /// Qualquer erro vira tabela vazia + mensagem mascarada.
    pub async fn fetch_table(&self, url: &str) -> TableFetch {
        match self.try_fetch_table(url).await {
            Ok(table) => TableFetch {
                table,
                error: None,
                status: None,
            },
            Err(e) => {
                let message = redact_url(&e.to_string());
                tracing::warn!("⚠️ Falha ao buscar {}: {}", redact_url(url), message);
                TableFetch {
                    table: Table::default(),
                    error: Some(message),
                    status: e.status(),
                }
            }
        }
    }

    /// GET simples usado pelo teste de conexão; só falha em erro de transporte
    pub async fn probe(&self, url: &str) -> Result<ProbeResponse> {
        tracing::debug!("PROBE {}", redact_url(url));

        let response = self.http_client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ProbeResponse { status, body })
    }
}

/// Prefixo do corpo (até 500 bytes) sem cortar caractere UTF-8
pub fn body_preview(body: &str) -> &str {
    if body.len() <= DIAGNOSTIC_PREVIEW_BYTES {
        return body;
    }
    let mut end = DIAGNOSTIC_PREVIEW_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
