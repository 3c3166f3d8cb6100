//! Copyright (c) 2023 University of New Hampshire
//! SPDX-License-Identifier: MIT

pub mod prelude {
    pub use aide;
    pub use anyhow;
    pub use async_trait;
    pub use axum;
    pub use axum_extra;
    pub use axum_jsonschema;
    pub use chrono;
    pub use config;
    pub use dashmap;
    pub use futures;
    pub use hyper;
    pub use itertools;
    pub use macaddr;
    pub use once_cell;
    pub use parking_lot;
    pub use reqwest;
    pub use schemars;
    pub use serde_json;
    pub use serde_yaml;
    pub use thiserror;
    pub use tokio;
    pub use tower;
    pub use tower_http;
    pub use tracing;
    pub use url;

    pub use serde::{Deserialize, Serialize};
}
