//! Copyright (c) 2023 University of New Hampshire
//! SPDX-License-Identifier: MIT
//! Configuration for the boot script server.
//!
//! Settings load once from a YAML file (default `config/bss.yaml`, overridable
//! with `BSS_CONFIG_PATH`) and are exposed through the [`settings`] accessor.
//! A handful of fields also accept an environment-variable override, applied
//! after the file is parsed, matching the table in the project's external
//! interface documentation.

use std::{collections::HashMap, time::Duration};

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    ERROR,
    WARN,
    #[default]
    INFO,
    DEBUG,
    TRACE,
    OFF,
}

impl From<LoggingLevel> for LevelFilter {
    fn from(value: LoggingLevel) -> Self {
        match value {
            LoggingLevel::ERROR => LevelFilter::ERROR,
            LoggingLevel::WARN => LevelFilter::WARN,
            LoggingLevel::INFO => LevelFilter::INFO,
            LoggingLevel::DEBUG => LevelFilter::DEBUG,
            LoggingLevel::TRACE => LevelFilter::TRACE,
            LoggingLevel::OFF => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_file: Option<String>,

    #[serde(default)]
    pub max_level: LoggingLevel,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HostPortPair {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for HostPortPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum KvBackendConfig {
    /// A real etcd cluster: the production transactional KV + distributed lock backend.
    Etcd {
        endpoints: Vec<String>,
        #[serde(default = "default_lock_lease_seconds")]
        lock_lease_seconds: u64,
    },
    /// An in-process KV store, used for local development and the test suite.
    Memory {
        #[serde(default = "default_lock_lease_seconds")]
        lock_lease_seconds: u64,
    },
}

fn default_lock_lease_seconds() -> u64 {
    5
}

impl KvBackendConfig {
    pub fn lock_lease(&self) -> Duration {
        let secs = match self {
            KvBackendConfig::Etcd {
                lock_lease_seconds, ..
            } => *lock_lease_seconds,
            KvBackendConfig::Memory {
                lock_lease_seconds, ..
            } => *lock_lease_seconds,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub bind_addr: HostPortPair,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    #[serde(default = "default_ipxe_server")]
    pub ipxe_server: String,
    #[serde(default = "default_chain_proto")]
    pub chain_proto: String,
    #[serde(default = "default_gw_uri")]
    pub gw_uri: String,
}

fn default_ipxe_server() -> String {
    "api-gw-service-nmn.local".to_string()
}
fn default_chain_proto() -> String {
    "https".to_string()
}
fn default_gw_uri() -> String {
    "/apis/bss".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            ipxe_server: default_ipxe_server(),
            chain_proto: default_chain_proto(),
            gw_uri: default_gw_uri(),
        }
    }
}

impl ChainConfig {
    /// `<proto>://<server><gw_uri>`
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.chain_proto, self.ipxe_server, self.gw_uri)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BSS_IPXE_SERVER") {
            self.ipxe_server = v;
        }
        if let Ok(v) = std::env::var("BSS_CHAIN_PROTO") {
            self.chain_proto = v;
        }
        if let Ok(v) = std::env::var("BSS_GW_URI") {
            self.gw_uri = v;
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    #[serde(default = "default_presign_hours")]
    pub presign_valid_hours: u64,
}

fn default_presign_hours() -> u64 {
    24
}

impl ObjectStoreConfig {
    pub fn presign_validity(&self) -> Duration {
        Duration::from_secs(self.presign_valid_hours * 3600)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpireConfig {
    pub token_endpoint: String,
    #[serde(default = "default_spire_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_spire_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    pub base_url: String,
    #[serde(default = "default_inventory_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_inventory_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiscoveryConfig {
    #[serde(default = "default_hsm_retrieval_delay")]
    pub hsm_retrieval_delay_seconds: u64,
    #[serde(default = "default_boot_retry_delay")]
    pub boot_retry_delay_seconds: u64,
    #[serde(default)]
    pub blocklist_roles: Vec<String>,
}

fn default_hsm_retrieval_delay() -> u64 {
    10
}
fn default_boot_retry_delay() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct BssConfig {
    pub kv: KvBackendConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    pub object_store: ObjectStoreConfig,
    pub spire: SpireConfig,
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Free-form per-deployment annotations, exposed verbatim through `/dumpstate`.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

fn config_path() -> String {
    std::env::var("BSS_CONFIG_PATH").unwrap_or_else(|_| "config/bss.yaml".to_string())
}

fn load() -> BssConfig {
    let mut cfg: BssConfig = config::Config::builder()
        .add_source(config::File::with_name(&config_path()))
        .build()
        .expect("couldn't load config file")
        .try_deserialize()
        .expect("couldn't load config file, invalid format");

    cfg.chain.apply_env();
    cfg
}

static CONFIG: once_cell::sync::OnceCell<BssConfig> = once_cell::sync::OnceCell::new();

pub fn settings() -> &'static BssConfig {
    CONFIG.get_or_init(load)
}

/// Loads and validates the config file without installing it as the process-wide
/// singleton. Used by the `check-config` CLI subcommand.
pub fn validate(path: Option<&str>) -> Result<BssConfig, anyhow::Error> {
    let path = path.map(str::to_string).unwrap_or_else(config_path);
    let mut cfg: BssConfig = config::Config::builder()
        .add_source(config::File::with_name(&path))
        .build()?
        .try_deserialize()?;
    cfg.chain.apply_env();
    Ok(cfg)
}
