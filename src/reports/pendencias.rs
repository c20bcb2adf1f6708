//! Relatório de Pendências
//!
//! Filtros de funil (categoria e, no funil de trâmites, etapa), métricas,
//! tipos de pendência, tabela detalhada e séries para os gráficos.
//! Todas as funções são puras sobre a [`Table`] recebida.

use super::PendingFields;
use crate::services::deal_loader::DealData;
use bitrix::Table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ALL_OPTION: &str = "Todos";
pub const CATEGORY_COMMERCIAL: &str = "0";
pub const CATEGORY_ADMINISTRATIVE: &str = "2";
pub const STAGE_PENDING_DOCUMENTS: &str = "C2:PREPARATION";

pub const CATEGORY_COLUMN: &str = "CATEGORY_ID";
pub const STAGE_COLUMN: &str = "STAGE_ID";

pub const SIMULATED_WARNING: &str =
    "⚠️ Os dados exibidos são simulados e não refletem informações reais do Bitrix24";

pub const WITH_PENDING_LABEL: &str = "Com Pendências";
pub const WITHOUT_PENDING_LABEL: &str = "Sem Pendências";

/// Opção de um seletor (valor bruto + rótulo exibido)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// Seleção atual dos filtros; `None` significa "Todos"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub category: Option<String>,
    pub stage: Option<String>,
}

impl FilterSelection {
    pub fn new(category: Option<&str>, stage: Option<&str>) -> Self {
        Self {
            category: normalize_choice(category),
            stage: normalize_choice(stage),
        }
    }

    /// Etapa só vale dentro do funil de trâmites administrativos
    pub fn effective_stage(&self) -> Option<&str> {
        match self.category.as_deref() {
            Some(CATEGORY_ADMINISTRATIVE) => self.stage.as_deref(),
            _ => None,
        }
    }
}

fn normalize_choice(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(ALL_OPTION) || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn category_label(value: &str) -> String {
    match value {
        CATEGORY_COMMERCIAL => "COMERCIAL".to_string(),
        CATEGORY_ADMINISTRATIVE => "TRÂMITES ADMINISTRATIVO".to_string(),
        other => other.to_string(),
    }
}

pub fn stage_label(value: &str) -> String {
    match value {
        STAGE_PENDING_DOCUMENTS => "PENDENTE DOCUMENTOS".to_string(),
        other => other.to_string(),
    }
}

fn all_option() -> FilterOption {
    FilterOption {
        value: ALL_OPTION.to_string(),
        label: ALL_OPTION.to_string(),
    }
}

/// Valores distintos não vazios, ordenados
fn distinct_sorted<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut distinct: Vec<String> = values
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    distinct.sort();
    distinct.dedup();
    distinct
}

/// "Todos" + categorias presentes na tabela
pub fn category_options(table: &Table) -> Vec<FilterOption> {
    let mut options = vec![all_option()];
    options.extend(
        distinct_sorted(table.column_values(CATEGORY_COLUMN).into_iter()).into_iter().map(|value| FilterOption {
            label: category_label(&value),
            value,
        }),
    );
    options
}

/// Etapas do funil de trâmites; `None` quando o seletor não deve aparecer
pub fn stage_options(table: &Table, selection: &FilterSelection) -> Option<Vec<FilterOption>> {
    if selection.category.as_deref() != Some(CATEGORY_ADMINISTRATIVE) || !table.has_column(STAGE_COLUMN) {
        return None;
    }

    let stages = distinct_sorted(
        table
            .rows()
            .filter(|row| row.get(CATEGORY_COLUMN).map(str::trim) == Some(CATEGORY_ADMINISTRATIVE))
            .map(|row| row.get(STAGE_COLUMN)),
    );

    let mut options = vec![all_option()];
    options.extend(stages.into_iter().map(|value| FilterOption {
        label: stage_label(&value),
        value,
    }));
    Some(options)
}

/// Aplica categoria e depois etapa; a tabela original não é alterada
pub fn apply_filters(table: &Table, selection: &FilterSelection) -> Table {
    let category = selection
        .category
        .as_deref()
        .filter(|_| table.has_column(CATEGORY_COLUMN));
    let stage = selection
        .effective_stage()
        .filter(|_| table.has_column(STAGE_COLUMN));

    table.filter(|row| {
        let category_ok = category.map_or(true, |c| row.get(CATEGORY_COLUMN).map(str::trim) == Some(c));
        let stage_ok = stage.map_or(true, |s| row.get(STAGE_COLUMN).map(str::trim) == Some(s));
        category_ok && stage_ok
    })
}

/// count / total × 100 com uma casa decimal; 0.0 quando não há linhas
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingMetrics {
    pub total: usize,
    pub pendencias_count: usize,
    pub pendencias_percent: f64,
    pub data_marcada_count: usize,
    pub data_marcada_percent: f64,
}

pub fn compute_metrics(table: &Table, fields: &PendingFields) -> PendingMetrics {
    let total = table.len();
    let pendencias_count = table.rows().filter(|r| r.is_filled(&fields.pendencias)).count();
    let data_marcada_count = table.rows().filter(|r| r.is_filled(&fields.data_marcada)).count();

    PendingMetrics {
        total,
        pendencias_count,
        pendencias_percent: percentage(pendencias_count, total),
        data_marcada_count,
        data_marcada_percent: percentage(data_marcada_count, total),
    }
}

/// Linha da tabela "Tipos de Pendências"
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Contagem por tipo de pendência, decrescente; empates mantêm a ordem de aparição
pub fn pending_frequency(table: &Table, field: &str) -> Vec<FrequencyEntry> {
    let mut entries: Vec<FrequencyEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in table.column_values(field).into_iter().flatten() {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match index.get(value) {
            Some(&pos) => entries[pos].count += 1,
            None => {
                index.insert(value.to_string(), entries.len());
                entries.push(FrequencyEntry {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// "Pendências Detalhadas": só linhas com pendência, cabeçalhos legíveis
pub fn detail_table(table: &Table, fields: &PendingFields) -> Table {
    let id_column = if table.has_column("ID") { "ID" } else { "TITLE" };
    let columns = [
        id_column,
        STAGE_COLUMN,
        fields.pendencias.as_str(),
        fields.data_marcada.as_str(),
    ];

    table
        .filter(|row| row.is_filled(&fields.pendencias))
        .select(&columns)
        .rename(|column| {
            let label = match column {
                "ID" => "ID",
                "TITLE" => "Título",
                STAGE_COLUMN => "Etapa",
                c if c == fields.pendencias => "Pendência",
                c if c == fields.data_marcada => "Hora Marcada",
                _ => return None,
            };
            Some(label.to_string())
        })
}

/// "Dados Filtrados": colunas principais do subconjunto filtrado
pub fn filtered_rows(table: &Table, fields: &PendingFields) -> Table {
    table.select(&[
        "ID",
        "TITLE",
        CATEGORY_COLUMN,
        STAGE_COLUMN,
        fields.pendencias.as_str(),
        fields.data_marcada.as_str(),
    ])
}

/// Barra de gráfico
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBar {
    pub label: String,
    pub count: usize,
}

/// "Distribuição por Categoria"
pub fn category_distribution(table: &Table) -> Vec<ChartBar> {
    pending_frequency(table, CATEGORY_COLUMN)
        .into_iter()
        .map(|entry| ChartBar {
            label: category_label(&entry.value),
            count: entry.count,
        })
        .collect()
}

/// "Distribuição por Status de Pendência"
pub fn pending_status_distribution(table: &Table, field: &str) -> Vec<ChartBar> {
    let with_pending = table.rows().filter(|r| r.is_filled(field)).count();
    vec![
        ChartBar {
            label: WITH_PENDING_LABEL.to_string(),
            count: with_pending,
        },
        ChartBar {
            label: WITHOUT_PENDING_LABEL.to_string(),
            count: table.len() - with_pending,
        },
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportFilters {
    pub selection: FilterSelection,
    pub category_options: Vec<FilterOption>,
    /// Presente apenas quando a categoria "2" está selecionada
    pub stage_options: Option<Vec<FilterOption>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCharts {
    pub by_category: Vec<ChartBar>,
    pub by_pending_status: Vec<ChartBar>,
}

/// Documento completo devolvido por `GET /api/reports/pendencias`
#[derive(Debug, Clone, Serialize)]
pub struct PendenciasReport {
    pub generated_at: DateTime<Utc>,
    pub simulated: bool,
    pub warning: Option<String>,
    pub notices: Vec<String>,
    pub fields: PendingFields,
    pub filters: ReportFilters,
    pub metrics: PendingMetrics,
    pub pending_types: Vec<FrequencyEntry>,
    pub detail: Table,
    pub rows: Table,
    pub charts: ReportCharts,
}

pub fn build_report(data: &DealData, selection: &FilterSelection, fields: &PendingFields) -> PendenciasReport {
    let filtered = apply_filters(&data.table, selection);

    PendenciasReport {
        generated_at: Utc::now(),
        simulated: data.simulated,
        warning: data.simulated.then(|| SIMULATED_WARNING.to_string()),
        notices: data.notices.clone(),
        fields: fields.clone(),
        filters: ReportFilters {
            selection: selection.clone(),
            category_options: category_options(&data.table),
            stage_options: stage_options(&data.table, selection),
        },
        metrics: compute_metrics(&filtered, fields),
        pending_types: pending_frequency(&filtered, &fields.pendencias),
        detail: detail_table(&filtered, fields),
        rows: filtered_rows(&filtered, fields),
        charts: ReportCharts {
            by_category: category_distribution(&filtered),
            by_pending_status: pending_status_distribution(&filtered, &fields.pendencias),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deals(rows: &[[&str; 5]]) -> Table {
        let mut table = Table::with_columns(["ID", "CATEGORY_ID", "STAGE_ID", "UF_CRM_PENDENCIAS", "UF_CRM_DATA_MARCADA"]);
        for row in rows {
            table.push_row(row.iter().map(|v| Some(v.to_string())).collect());
        }
        table
    }

    fn sample() -> Table {
        deals(&[
            ["1", "0", "C0:NEW", "Pendência documento", ""],
            ["2", "2", "C2:PREPARATION", "Pendência pagamento", "2023-05-10 10:00"],
            ["3", "2", "C2:NEW", "", ""],
            ["4", "2", "C2:PREPARATION", "  ", ""],
            ["5", "2", "C2:PREPARATION", "Pendência pagamento", ""],
        ])
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
    }

    #[test]
    fn test_selection_normalizes_all() {
        assert_eq!(FilterSelection::new(Some("Todos"), Some("")), FilterSelection::default());
        assert_eq!(FilterSelection::new(Some(" all "), None), FilterSelection::default());

        let sel = FilterSelection::new(Some("0"), Some(STAGE_PENDING_DOCUMENTS));
        assert_eq!(sel.effective_stage(), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(category_label("0"), "COMERCIAL");
        assert_eq!(category_label("2"), "TRÂMITES ADMINISTRATIVO");
        assert_eq!(category_label("7"), "7");
        assert_eq!(stage_label("C2:PREPARATION"), "PENDENTE DOCUMENTOS");
        assert_eq!(stage_label("C2:NEW"), "C2:NEW");
    }

    #[test]
    fn test_category_options_sorted_with_all_first() {
        let options = category_options(&sample());
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["Todos", "0", "2"]);
        assert_eq!(options[2].label, "TRÂMITES ADMINISTRATIVO");
    }

    #[test]
    fn test_stage_options_only_for_administrative_category() {
        let table = sample();
        assert!(stage_options(&table, &FilterSelection::default()).is_none());
        assert!(stage_options(&table, &FilterSelection::new(Some("0"), None)).is_none());

        let options = stage_options(&table, &FilterSelection::new(Some("2"), None)).unwrap();
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["Todos", "C2:NEW", "C2:PREPARATION"]);
        assert_eq!(options[2].label, "PENDENTE DOCUMENTOS");
    }

    #[test]
    fn test_filter_category_and_stage_is_idempotent() {
        let table = sample();
        let selection = FilterSelection::new(Some("2"), Some("C2:PREPARATION"));

        let once = apply_filters(&table, &selection);
        let ids: Vec<_> = once.column_values("ID").into_iter().flatten().collect();
        assert_eq!(ids, ["2", "4", "5"]);

        assert_eq!(apply_filters(&once, &selection), once);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_stage_ignored_outside_administrative_category() {
        let table = sample();
        let filtered = apply_filters(&table, &FilterSelection::new(Some("0"), Some("C2:PREPARATION")));
        assert_eq!(filtered.len(), 1);

        let all = apply_filters(&table, &FilterSelection::new(None, Some("C2:PREPARATION")));
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_metrics_trim_blank_values() {
        let metrics = compute_metrics(&sample(), &PendingFields::default());
        assert_eq!(metrics.total, 5);
        assert_eq!(metrics.pendencias_count, 3);
        assert_eq!(metrics.pendencias_percent, 60.0);
        assert_eq!(metrics.data_marcada_count, 1);
        assert_eq!(metrics.data_marcada_percent, 20.0);
    }

    #[test]
    fn test_metrics_on_empty_table() {
        let metrics = compute_metrics(&Table::default(), &PendingFields::default());
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.pendencias_percent, 0.0);
    }

    #[test]
    fn test_frequency_sorted_with_stable_ties() {
        let table = deals(&[
            ["1", "0", "", "B", ""],
            ["2", "0", "", "A", ""],
            ["3", "0", "", " A ", ""],
            ["4", "0", "", "C", ""],
            ["5", "0", "", "", ""],
        ]);
        let freq = pending_frequency(&table, "UF_CRM_PENDENCIAS");
        let pairs: Vec<_> = freq.iter().map(|e| (e.value.as_str(), e.count)).collect();
        assert_eq!(pairs, [("A", 2), ("B", 1), ("C", 1)]);
    }

    #[test]
    fn test_detail_table_renames_and_keeps_only_pending() {
        let detail = detail_table(&sample(), &PendingFields::default());
        assert_eq!(detail.columns(), ["ID", "Etapa", "Pendência", "Hora Marcada"]);
        assert_eq!(detail.len(), 3);
    }

    #[test]
    fn test_detail_table_uses_title_without_id() {
        let mut table = Table::with_columns(["TITLE", "UF_CRM_PENDENCIAS"]);
        table.push_row(vec![Some("Negócio 1".into()), Some("Pendência contrato".into())]);

        let detail = detail_table(&table, &PendingFields::default());
        assert_eq!(detail.columns(), ["Título", "Pendência"]);
    }

    #[test]
    fn test_charts() {
        let table = sample();
        let by_category = category_distribution(&table);
        assert_eq!(by_category[0], ChartBar { label: "TRÂMITES ADMINISTRATIVO".into(), count: 4 });
        assert_eq!(by_category[1], ChartBar { label: "COMERCIAL".into(), count: 1 });

        let status = pending_status_distribution(&table, "UF_CRM_PENDENCIAS");
        assert_eq!(status[0].count, 3);
        assert_eq!(status[1].label, "Sem Pendências");
        assert_eq!(status[1].count, 2);
    }

    #[test]
    fn test_build_report_flags_simulated() {
        let data = DealData {
            table: sample(),
            simulated: true,
            notices: vec!["Configuração não encontrada.".to_string()],
        };
        let selection = FilterSelection::new(Some("2"), None);
        let report = build_report(&data, &selection, &PendingFields::default());

        assert!(report.simulated);
        assert_eq!(report.warning.as_deref(), Some(SIMULATED_WARNING));
        assert_eq!(report.metrics.total, 4);
        assert!(report.filters.stage_options.is_some());
        assert_eq!(report.filters.category_options.len(), 3);
    }
}
