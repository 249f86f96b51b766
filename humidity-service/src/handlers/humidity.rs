use crate::models::HumidityResponse;
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

/// `GET /humidity`: latest reading, served from cache while fresh.
pub async fn get_humidity(
    State(state): State<AppState>,
) -> Result<Json<HumidityResponse>, AppError> {
    let reading = state.fetcher.fetch().await?;
    Ok(Json(HumidityResponse::from(&reading)))
}
