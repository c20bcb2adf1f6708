//! Relatórios do painel
//!
//! Cada relatório recebe a tabela de negócios já normalizada e devolve um
//! documento serializável pronto para o front-end.

pub mod pendencias;
pub mod simulated;

use crate::config::settings::ReportSettings;
use serde::Serialize;

/// Códigos dos campos personalizados usados pelo relatório de pendências
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingFields {
    pub pendencias: String,
    pub data_marcada: String,
}

impl PendingFields {
    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self {
            pendencias: settings.pendencias_field.clone(),
            data_marcada: settings.data_marcada_field.clone(),
        }
    }
}

impl Default for PendingFields {
    fn default() -> Self {
        Self {
            pendencias: "UF_CRM_PENDENCIAS".to_string(),
            data_marcada: "UF_CRM_DATA_MARCADA".to_string(),
        }
    }
}

pub use pendencias::{build_report, FilterSelection, PendenciasReport};
