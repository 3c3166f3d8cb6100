use std::collections::HashMap;

use aide::axum::{routing::get, ApiRouter};
use axum::{extract::State, Json};
use models::{BootParamsEntry, ImageData, ImageType};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{error::BssError, state::AppState};

#[derive(Serialize, JsonSchema)]
pub struct DumpState {
    bindings: Vec<BootParamsEntry>,
    kernels: Vec<ImageData>,
    initrds: Vec<ImageData>,
    annotations: HashMap<String, String>,
}

async fn dump_state(State(state): State<AppState>) -> Result<Json<DumpState>, BssError> {
    let bindings = state.params.get_all().await?;
    let kernels = state.images.list_images(ImageType::Kernel).await?;
    let initrds = state.images.list_images(ImageType::Initrd).await?;

    Ok(Json(DumpState {
        bindings,
        kernels,
        initrds,
        annotations: config::settings().annotations.clone(),
    }))
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route("/", get(dump_state))
}
