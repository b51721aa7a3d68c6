//! Monitor operator profiles.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::record::{Event, Filter, PROFILE_METADATA};
use crate::transport::Transport;

/// Descriptive metadata published by a monitor's operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: Option<String>,
    pub about: Option<String>,
    pub picture: Option<String>,
    pub website: Option<String>,

    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    /// Parse the JSON content of a profile record
    pub fn from_content(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn from_event(event: &Event) -> Result<Self> {
        Self::from_content(&event.content).map_err(|err| MonitorError::profile(&event.pubkey, err))
    }
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, identity: &str) -> Result<Profile>;
}

/// Looks up the newest profile record of an identity through the transport
pub struct TransportProfiles {
    transport: Arc<dyn Transport>,
}

impl TransportProfiles {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ProfileSource for TransportProfiles {
    async fn fetch_profile(&self, identity: &str) -> Result<Profile> {
        let filter = Filter::new().kinds([PROFILE_METADATA]).authors([identity]);
        let events = self.transport.fetch_events(&filter).await?;

        let newest = events
            .iter()
            .filter(|event| event.pubkey == identity)
            .max_by_key(|event| event.created_at)
            .ok_or_else(|| MonitorError::profile(identity, "no profile published"))?;
        Profile::from_event(newest)
    }
}
