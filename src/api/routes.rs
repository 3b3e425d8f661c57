//! HTTP route handlers for Axum.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::warn;

use crate::{api::types::SignalDto, config::Settings, signals::SIGNALS_CSV};

use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub drug: Option<String>,
    pub limit: Option<usize>,
    /// Drop rows whose ROR or interval is not finite.
    #[serde(default)]
    pub finite: bool,
}

/// Rows in exported order, optionally narrowed to a drug substring.
pub async fn list_signals(
    states: State<AppState>,
    Query(query): Query<SignalQuery>,
) -> ApiResult<Vec<SignalDto>> {
    let mut signals = load_signals(&states.settings)?;
    if let Some(drug) = query.drug {
        let needle = drug.to_lowercase();
        signals.retain(|s| s.drug.to_lowercase().contains(&needle));
    }
    if query.finite {
        signals.retain(SignalDto::is_finite);
    }
    signals.truncate(query.limit.unwrap_or(DEFAULT_LIMIT));
    Ok(Json(signals))
}

pub async fn get_signal(
    Path(drug): Path<String>,
    states: State<AppState>,
) -> ApiResult<SignalDto> {
    load_signals(&states.settings)?
        .into_iter()
        .find(|s| s.drug.eq_ignore_ascii_case(&drug))
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no signal row for {drug}")))
}

fn load_signals(settings: &Settings) -> Result<Vec<SignalDto>, (StatusCode, String)> {
    let path = settings.join_output(SIGNALS_CSV);
    if !path.exists() {
        warn!("signals.csv missing; run signal first");
        return Ok(Vec::new());
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    reader
        .deserialize::<SignalDto>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
