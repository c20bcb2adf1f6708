use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::Instant;

use crate::reports::{build_report, FilterSelection, PendenciasReport, PendingFields};
use crate::services::deal_loader::{load_deal_data, DealOrigin, LoadOptions};
use crate::utils::logging::*;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PendenciasQuery {
    pub category: Option<String>,
    pub stage: Option<String>,
    #[serde(default)]
    pub simulated: bool,
    pub rows: Option<usize>,
}

pub async fn pendencias_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendenciasQuery>,
) -> Json<PendenciasReport> {
    let start_time = Instant::now();
    log_request_received("/api/reports/pendencias", "GET");

    let resolution = state.connections.resolve().await;
    let origin = DealOrigin::from_resolution(&resolution);
    let options = LoadOptions {
        force_simulated: query.simulated,
        simulated_rows: query.rows,
    };

    let data = load_deal_data(&state.bitrix, &origin, &options, &state.settings.report).await;

    let fields = PendingFields::from_settings(&state.settings.report);
    let selection = FilterSelection::new(query.category.as_deref(), query.stage.as_deref());
    let report = build_report(&data, &selection, &fields);

    log_request_processed(
        "/api/reports/pendencias",
        200,
        start_time.elapsed().as_millis() as u64,
    );

    Json(report)
}
