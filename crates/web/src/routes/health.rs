use aide::axum::{routing::get, ApiRouter};
use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

const SENTINEL_KEY: &str = "/bss/healthz-sentinel";

async fn healthz(State(state): State<AppState>) -> StatusCode {
    match state.kv.get(SENTINEL_KEY).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::error!(error = %e, "healthz probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route("/", get(healthz))
}
