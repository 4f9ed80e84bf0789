use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use crate::barcode;
use crate::clock::HourIndex;
use crate::error::AppError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{CurrentQuery, CurrentResponse};
use crate::state::AppState;

// GET /api/current - this hour's prompt and its reply
pub async fn current_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CurrentQuery>,
) -> Result<Json<CurrentResponse>, AppError> {
    REQUEST_TOTAL.inc();

    let hour = HourIndex::derive(state.clock.now(), state.epoch).ok_or(AppError::EpochNotReached)?;

    let lookup = state
        .cache
        .get_or_create(hour.index, state.completer.as_ref())
        .await;
    let cached = lookup.is_hit();
    let record = lookup.into_record();

    let barcode = if query.barcode {
        let encoded = barcode::render_base64(&record.prompt)
            .map_err(|e| AppError::Internal(format!("barcode: {e}")))?;
        Some(encoded)
    } else {
        None
    };

    // countdown is taken after the lookup, which may have waited on upstream
    let seconds_until_next = HourIndex::derive(state.clock.now(), state.epoch)
        .filter(|h| h.index == hour.index)
        .map_or(0, |h| h.seconds_until_next);

    Ok(Json(CurrentResponse {
        index: hour.index,
        prompt: record.prompt,
        reply: record.reply,
        seconds_until_next,
        cached,
        barcode,
    }))
}
