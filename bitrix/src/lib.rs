//! Cliente de leitura do Bitrix24
//!
//! Este crate concentra o acesso ao CRM usado pelo painel:
//!
//! - Montagem de URLs para as duas APIs (REST webhook e BI Connector)
//! - Classificação de uma URL de webhook vinda do cofre de segredos
//! - GET com timeouts e diagnóstico mascarado
//! - Normalização das respostas para uma [`Table`] única
//!
//! # APIs suportadas
//!
//! ## REST (webhook)
//! `https://{conta}.bitrix24.com.br/rest/{token}/crm.deal.list`, resposta
//! `{"result": [{...}, ...]}`.
//!
//! ## BI Connector
//! `https://{conta}.bitrix24.com.br/bitrix/tools/biconnector/pbi.php?token={token}&table=crm_deal`,
//! resposta `[["ID", ...], ["1", ...], ...]` (primeira linha é o cabeçalho).
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use bitrix::{ApiVariant, BitrixClient, ConnectionConfig, CRM_DEAL};
//!
//! #[tokio::main]
//! async fn main() -> bitrix::Result<()> {
//!     let token = std::env::var("BITRIX_TOKEN").expect("BITRIX_TOKEN não configurado");
//!     let conn = ConnectionConfig::new("minhaconta", token, ApiVariant::BiConnector);
//!
//!     let client = BitrixClient::new()?;
//!     let deals = client.try_fetch_table(conn.url(CRM_DEAL).unwrap()).await?;
//!     println!("{} negócios", deals.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod payload;
pub mod table;

pub use client::{body_preview, BitrixClient, ProbeResponse, TableFetch};
pub use connection::{
    build_urls, parse_webhook_url, redact_url, ApiVariant, ConnectionConfig, CRM_DEAL,
    CRM_DEAL_FIELDS, CRM_DEAL_UF, DEFAULT_DOMAIN,
};
pub use error::{BitrixError, Result};
pub use payload::ParsedPayload;
pub use table::{Cell, Row, Table};
