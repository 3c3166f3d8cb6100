//! C8: the HTTP surface. Thin translation of REST calls onto the
//! image registry, parameter store, resolver, and discovery flow, built
//! with `axum` + `aide` exactly as the grounding repo's web layer is built.

pub mod error;
pub mod routes;
pub mod state;

use std::{str::FromStr, sync::Arc};

use aide::{
    axum::ApiRouter,
    openapi::{OpenApi, Tag},
    transform::TransformOpenApi,
};
use axum::{http::StatusCode, Extension, Json};
use bootstore::{ImageRegistry, ParamStore};
use collaborators::{
    HttpObjectStoreClient, HttpSpireClient, HttpStateManagerClient, ObjectStoreClient,
    SpireClient, StateManagerClient,
};
use config::{BssConfig, KvBackendConfig};
use discovery::DiscoveryFlow;
use kvstore::{EtcdKv, KvStore, MemoryKv};
use resolver::Resolver;
use std::time::Duration;

use crate::{error::ApiError, state::AppState};

async fn build_kv(cfg: &BssConfig) -> Arc<dyn KvStore> {
    match &cfg.kv {
        KvBackendConfig::Etcd { endpoints, .. } => {
            let client = EtcdKv::connect(endpoints)
                .await
                .expect("failed to connect to etcd");
            Arc::new(client)
        }
        KvBackendConfig::Memory { .. } => Arc::new(MemoryKv::new()),
    }
}

/// Wires the concrete collaborator clients. Production builds always talk
/// to real endpoints; an environment variable escape hatch to the
/// in-memory fakes is intentionally not provided here -- that wiring lives
/// only in each crate's own test modules.
fn build_collaborators(
    cfg: &BssConfig,
) -> (
    Arc<dyn StateManagerClient>,
    Arc<dyn SpireClient>,
    Arc<dyn ObjectStoreClient>,
) {
    let state_manager: Arc<dyn StateManagerClient> = Arc::new(HttpStateManagerClient::new(
        cfg.inventory.base_url.clone(),
        Duration::from_secs(cfg.inventory.timeout_secs),
    ));
    let spire: Arc<dyn SpireClient> = Arc::new(HttpSpireClient::new(
        cfg.spire.token_endpoint.clone(),
        Duration::from_secs(cfg.spire.timeout_secs),
    ));
    let object_store: Arc<dyn ObjectStoreClient> = Arc::new(HttpObjectStoreClient::new(
        cfg.object_store.endpoint.clone(),
        cfg.object_store.access_key.clone(),
        cfg.object_store.secret_key.clone(),
        cfg.object_store.bucket.clone(),
    ));
    (state_manager, spire, object_store)
}

async fn build_state(cfg: &BssConfig) -> AppState {
    let kv = build_kv(cfg).await;
    let images = Arc::new(ImageRegistry::new(kv.clone()));
    let (state_manager, spire, object_store) = build_collaborators(cfg);

    let params = Arc::new(ParamStore::new(kv.clone(), images.clone(), state_manager.clone()));
    let resolver = Arc::new(Resolver::new(kv.clone(), images.clone(), state_manager.clone()));
    let discovery = Arc::new(DiscoveryFlow::new(
        kv.clone(),
        resolver.clone(),
        state_manager.clone(),
        cfg.discovery.clone(),
        cfg.chain.clone(),
    ));

    AppState {
        kv,
        images,
        params,
        resolver,
        discovery,
        state_manager,
        spire,
        object_store,
        chain_cfg: cfg.chain.clone(),
        discovery_cfg: cfg.discovery.clone(),
        presign_valid_for: cfg.object_store.presign_validity(),
    }
}

fn api_docs(api: TransformOpenApi) -> TransformOpenApi {
    api.title("BSS API")
        .summary("Boot script server: images, boot parameters, and iPXE scripts.")
        .description("")
        .tag(Tag {
            name: "BSS".into(),
            description: Some("Boot script server".into()),
            ..Default::default()
        })
        .default_response_with::<Json<ApiError>, _>(|res| {
            res.example(ApiError::trivial(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Default error, something has gone wrong".to_string(),
            ))
        })
}

pub async fn entry() {
    let cfg = config::settings();
    let state = build_state(cfg).await;

    let mut api = OpenApi::default();

    let app = ApiRouter::new()
        .nest_api_service("/bootparameters", routes::bootparameters::routes())
        .nest_api_service("/bootscript", routes::bootscript::routes())
        .nest_api_service("/hosts", routes::hosts::routes())
        .nest_api_service("/dumpstate", routes::dumpstate::routes())
        .nest_api_service("/healthz", routes::health::routes())
        .nest_api_service("/docs", routes::docs::routes())
        .finish_api_with(&mut api, api_docs)
        .layer(Extension(Arc::new(api)))
        .with_state(state);

    let api_addr = cfg.web.bind_addr.to_string();
    tracing::info!("binding to {}", api_addr);

    let res = axum::Server::bind(
        &std::net::SocketAddr::from_str(&api_addr).expect("invalid web.bind_addr"),
    )
    .serve(app.into_make_service())
    .await;

    if let Err(e) = res {
        tracing::error!(error = %e, "axum server exited with an error");
    }
}
