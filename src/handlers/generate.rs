use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use crate::encoder::encode;
use crate::error::AppError;
use crate::metrics::REQUEST_TOTAL;
use crate::models::{GenerateRequest, GenerateResponse};
use crate::state::AppState;

const RATE_LIMIT_KEY: &str = "generate";

// Pull a positive integer out of the loosely typed `number` field
fn parse_number(req: &GenerateRequest) -> Result<u64, AppError> {
    let value = req
        .number
        .as_ref()
        .ok_or_else(|| AppError::InvalidInput("number is required".to_string()))?;

    match (value.as_u64(), value.as_i64()) {
        (Some(n), _) if n >= 1 => Ok(n),
        (Some(_), _) | (None, Some(_)) => {
            Err(AppError::InvalidInput("number must be >= 1".to_string()))
        }
        (None, None) => Err(AppError::InvalidInput("number must be an integer".to_string())),
    }
}

// POST /generate - encode a caller-chosen number and ask the model about it.
// Not cached: the reply cache only holds hour indices.
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    REQUEST_TOTAL.inc();

    // only well-formed requests spend quota
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let number = parse_number(&payload)?;

    if !state.rate_limiter.check(RATE_LIMIT_KEY) {
        return Err(AppError::RateLimited);
    }

    let input = encode(number);
    let completion = state.completer.complete(&input).await;

    Ok(Json(GenerateResponse {
        input,
        response: completion.text(),
    }))
}
