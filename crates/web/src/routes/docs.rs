use aide::{
    axum::{routing::get, ApiRouter, IntoApiResponse},
    openapi::OpenApi,
};
use axum::{Extension, Json};

use crate::state::AppState;

async fn serve_api(Extension(api): Extension<OpenApi>) -> impl IntoApiResponse {
    Json(api)
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route("/", get(serve_api))
}
