use aide::axum::{routing::get, ApiRouter};
use axum::{extract::State, http::StatusCode, Json};
use models::ComponentRecord;

use crate::{error::BssError, state::AppState};

async fn list_hosts(State(state): State<AppState>) -> Result<Json<Vec<ComponentRecord>>, BssError> {
    Ok(Json(state.state_manager.list().await?))
}

async fn trigger_refresh(State(state): State<AppState>) -> Result<StatusCode, BssError> {
    state.state_manager.trigger_refresh().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route("/", get(list_hosts).post(trigger_refresh))
}
