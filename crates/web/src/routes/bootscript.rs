use aide::axum::{routing::get, ApiRouter};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use discovery::BootscriptPlan;
use models::BootScriptQuery;
use resolver::Identity;
use scriptbuilder::ScriptParams;

use crate::{error::BssError, state::AppState};

fn identity_from_query(query: &BootScriptQuery) -> Result<Identity, BssError> {
    if let Some(mac) = &query.mac {
        return Ok(Identity::Mac(mac.clone()));
    }
    if let Some(name) = &query.name {
        return Ok(Identity::Xname(name.clone()));
    }
    if let Some(nid) = query.nid {
        return Ok(Identity::Nid(nid));
    }
    Err(BssError::Validation(
        "one of mac, name, or nid is required".to_string(),
    ))
}

fn chain_line(state: &AppState, query: &BootScriptQuery) -> String {
    format!(
        "chain {}/boot/v1/bootscript{}",
        state.chain_cfg.base_url(),
        query_suffix(query)
    )
}

fn query_suffix(query: &BootScriptQuery) -> String {
    let mut parts = Vec::new();
    if let Some(mac) = &query.mac {
        parts.push(format!("mac={mac}"));
    }
    if let Some(name) = &query.name {
        parts.push(format!("name={name}"));
    }
    if let Some(nid) = query.nid {
        parts.push(format!("nid={nid}"));
    }
    if let Some(arch) = &query.arch {
        parts.push(format!("arch={arch}"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}

async fn get_bootscript(
    State(state): State<AppState>,
    Query(query): Query<BootScriptQuery>,
) -> Result<axum::response::Response, BssError> {
    let identity = identity_from_query(&query)?;
    let plan = state.discovery.plan(&identity, query.arch.as_deref()).await?;

    match plan {
        BootscriptPlan::Ready(boot_data, component) => {
            let xname = component
                .as_ref()
                .map(|c| c.id.clone())
                .or_else(|| match &identity {
                    Identity::Xname(x) => Some(x.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            let nid = component
                .as_ref()
                .and_then(|c| c.nid)
                .or(query.nid)
                .or_else(|| match &identity {
                    Identity::Nid(n) => Some(*n),
                    _ => None,
                });
            let script_params = ScriptParams {
                xname,
                nid,
                advertise_address: state.chain_cfg.base_url(),
            };
            let chain = chain_line(&state, &query);
            let script = scriptbuilder::build_script(
                &boot_data,
                &script_params,
                &chain,
                state.discovery_cfg.boot_retry_delay_seconds,
                state.spire.as_ref(),
                state.object_store.as_ref(),
                state.presign_valid_for,
            )
            .await?;
            Ok((StatusCode::OK, script).into_response())
        }
        BootscriptPlan::RetryAfterRefresh {
            chain_back_url,
            delay_secs,
        } => Ok(retry_script(&chain_back_url, delay_secs)),
        BootscriptPlan::RequestArchitecture { chain_back_url } => {
            Ok(retry_script(&chain_back_url, 0))
        }
        BootscriptPlan::NoUnknownConfig => Err(BssError::NotFound(
            "node is unknown and no discovery fallback is configured".to_string(),
        )),
        BootscriptPlan::Blocked => Err(BssError::Blocked(
            "component's role is blocklisted from discovery fallback".to_string(),
        )),
    }
}

fn retry_script(chain_back_url: &str, delay_secs: u64) -> axum::response::Response {
    let mut script = String::from("#!ipxe\n");
    if delay_secs > 0 {
        script.push_str(&format!("sleep {delay_secs}\n"));
    }
    script.push_str(&format!("chain {chain_back_url}\n"));
    (StatusCode::OK, script).into_response()
}

pub fn routes() -> ApiRouter<AppState> {
    ApiRouter::new().api_route("/", get(get_bootscript))
}
