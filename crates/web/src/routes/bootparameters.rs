use aide::axum::{routing::get, ApiRouter};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use models::{binding::nid_binding, BootFilterQuery, BootParams, BootParamsEntry, Selector};

use crate::{error::BssError, state::AppState};

/// Resolves a `?mac=&name=&nid=` filter down to a single binding key, the
/// same precedence the create/update paths use for MAC/NID expansion.
async fn resolve_filter_binding(
    state: &AppState,
    filter: &BootFilterQuery,
) -> Result<Option<String>, BssError> {
    if let Some(mac) = &filter.mac {
        return Ok(Some(match state.state_manager.get_by_mac(mac).await? {
            Some(component) => component.id,
            None => mac.clone(),
        }));
    }
    if let Some(name) = &filter.name {
        return Ok(Some(name.clone()));
    }
    if let Some(nid) = filter.nid {
        return Ok(Some(match state.state_manager.get_by_nid(nid).await? {
            Some(component) => component.id,
            None => nid_binding(nid),
        }));
    }
    Ok(None)
}

/// `GET /bootparameters` takes its filter either as `?mac=&name=&nid=` or as
/// a `BootParams`-shaped JSON body selecting by hosts/macs/nids; a present
/// body with no selector behaves the same as no filter at all.
async fn list_boot_parameters(
    State(state): State<AppState>,
    Query(filter): Query<BootFilterQuery>,
    body: Bytes,
) -> Result<Json<Vec<BootParamsEntry>>, BssError> {
    if !body.is_empty() {
        let filter_body: BootParams = serde_json::from_slice(&body)
            .map_err(|e| BssError::Validation(format!("invalid filter body: {e}")))?;
        return match filter_body.selector() {
            Selector::ImageOnly => Ok(Json(state.params.get_all().await?)),
            _ => Ok(Json(state.params.get_filtered(&filter_body).await?)),
        };
    }

    if filter.mac.is_none() && filter.name.is_none() && filter.nid.is_none() {
        return Ok(Json(state.params.get_all().await?));
    }

    match resolve_filter_binding(&state, &filter).await? {
        Some(binding) => {
            let entry = state.params.get_binding(&binding).await?;
            Ok(Json(entry.into_iter().collect()))
        }
        None => Ok(Json(vec![])),
    }
}

async fn create_boot_parameters(
    State(state): State<AppState>,
    Json(body): Json<BootParams>,
) -> Result<StatusCode, BssError> {
    state.params.store_new(&body).await?;
    Ok(StatusCode::CREATED)
}

async fn put_boot_parameters(
    State(state): State<AppState>,
    Json(body): Json<BootParams>,
) -> Result<StatusCode, BssError> {
    state.params.store(&body).await?;
    Ok(StatusCode::OK)
}

async fn patch_boot_parameters(
    State(state): State<AppState>,
    Json(body): Json<BootParams>,
) -> Result<StatusCode, BssError> {
    state.params.update(&body).await?;
    Ok(StatusCode::OK)
}

async fn delete_boot_parameters(
    State(state): State<AppState>,
    Json(body): Json<BootParams>,
) -> Result<StatusCode, BssError> {
    state.params.remove(&body).await?;
    Ok(StatusCode::OK)
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route(
        "/",
        get(list_boot_parameters)
            .post(create_boot_parameters)
            .put(put_boot_parameters)
            .patch(patch_boot_parameters)
            .delete(delete_boot_parameters),
    )
}
