//! Client for the hardware-inventory collaborator ("StateManager"): resolves
//! MAC/NID/name to a component record and reports whether inventory is
//! mid-refresh.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use models::{ComponentRecord, RetrievalState};

use crate::error::CollaboratorError;

#[async_trait]
pub trait StateManagerClient: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<ComponentRecord>, CollaboratorError>;
    async fn get_by_mac(&self, mac: &str) -> Result<Option<ComponentRecord>, CollaboratorError>;
    async fn get_by_nid(&self, nid: u32) -> Result<Option<ComponentRecord>, CollaboratorError>;
    async fn get_by_name(&self, name: &str) -> Result<Option<ComponentRecord>, CollaboratorError>;
    async fn list(&self) -> Result<Vec<ComponentRecord>, CollaboratorError>;
    async fn trigger_refresh(&self) -> Result<(), CollaboratorError>;
    async fn check_state(&self) -> Result<RetrievalState, CollaboratorError>;
}

pub struct HttpStateManagerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStateManagerClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build StateManager http client");
        Self { client, base_url }
    }

    async fn get_one(&self, path: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("StateManager", resp.status().as_u16()));
        }

        let record = resp
            .json::<ComponentRecord>()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))?;
        Ok(Some(record))
    }
}

#[async_trait]
impl StateManagerClient for HttpStateManagerClient {
    async fn get_by_id(&self, id: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        self.get_one(&format!("/components/by-id/{id}")).await
    }

    async fn get_by_mac(&self, mac: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        self.get_one(&format!("/components/by-mac/{mac}")).await
    }

    async fn get_by_nid(&self, nid: u32) -> Result<Option<ComponentRecord>, CollaboratorError> {
        self.get_one(&format!("/components/by-nid/{nid}")).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        self.get_one(&format!("/components/by-name/{name}")).await
    }

    async fn list(&self) -> Result<Vec<ComponentRecord>, CollaboratorError> {
        let resp = self
            .client
            .get(format!("{}/components", self.base_url))
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("StateManager", resp.status().as_u16()));
        }
        resp.json::<Vec<ComponentRecord>>()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))
    }

    async fn trigger_refresh(&self) -> Result<(), CollaboratorError> {
        let resp = self
            .client
            .post(format!("{}/refresh", self.base_url))
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("StateManager", resp.status().as_u16()));
        }
        Ok(())
    }

    async fn check_state(&self) -> Result<RetrievalState, CollaboratorError> {
        let resp = self
            .client
            .get(format!("{}/checkState", self.base_url))
            .send()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CollaboratorError::Status("StateManager", resp.status().as_u16()));
        }
        resp.json::<RetrievalState>()
            .await
            .map_err(|e| CollaboratorError::Request("StateManager", e.to_string()))
    }
}

/// In-memory fake used by tests: records are seeded directly, refresh just
/// flips `retrieving` back to `ready`.
#[derive(Default)]
pub struct FakeStateManagerClient {
    by_id: DashMap<String, ComponentRecord>,
    by_mac: DashMap<String, String>,
    by_nid: DashMap<u32, String>,
    by_name: DashMap<String, String>,
    retrieving: std::sync::atomic::AtomicBool,
}

impl FakeStateManagerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: ComponentRecord) {
        if let Some(mac) = &record.mac {
            self.by_mac.insert(mac.clone(), record.id.clone());
        }
        if let Some(nid) = record.nid {
            self.by_nid.insert(nid, record.id.clone());
        }
        self.by_name.insert(record.id.clone(), record.id.clone());
        self.by_id.insert(record.id.clone(), record);
    }

    pub fn set_retrieving(&self, retrieving: bool) {
        self.retrieving
            .store(retrieving, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl StateManagerClient for FakeStateManagerClient {
    async fn get_by_id(&self, id: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        Ok(self.by_id.get(id).map(|r| r.clone()))
    }

    async fn get_by_mac(&self, mac: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        match self.by_mac.get(mac) {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn get_by_nid(&self, nid: u32) -> Result<Option<ComponentRecord>, CollaboratorError> {
        match self.by_nid.get(&nid) {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<ComponentRecord>, CollaboratorError> {
        match self.by_name.get(name) {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ComponentRecord>, CollaboratorError> {
        Ok(self.by_id.iter().map(|r| r.clone()).collect())
    }

    async fn trigger_refresh(&self) -> Result<(), CollaboratorError> {
        self.set_retrieving(false);
        Ok(())
    }

    async fn check_state(&self) -> Result<RetrievalState, CollaboratorError> {
        if self.retrieving.load(std::sync::atomic::Ordering::SeqCst) {
            Ok(RetrievalState::Retrieving)
        } else {
            Ok(RetrievalState::Ready)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_resolves_by_mac_and_nid() {
        let fake = FakeStateManagerClient::new();
        fake.seed(ComponentRecord {
            id: "x0".into(),
            role: "Compute".into(),
            mac: Some("aa:bb".into()),
            nid: Some(7),
            endpoint_enabled: true,
            fqdn: None,
        });

        assert_eq!(fake.get_by_mac("aa:bb").await.unwrap().unwrap().id, "x0");
        assert_eq!(fake.get_by_nid(7).await.unwrap().unwrap().id, "x0");
        assert!(fake.get_by_mac("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retrieving_flag_controls_check_state() {
        let fake = FakeStateManagerClient::new();
        assert_eq!(fake.check_state().await.unwrap(), RetrievalState::Ready);
        fake.set_retrieving(true);
        assert_eq!(fake.check_state().await.unwrap(), RetrievalState::Retrieving);
    }
}
