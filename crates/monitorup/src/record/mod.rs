//! Generic signed record and query filter types.
//!
//! Signing and verification happen outside this crate; records arrive here
//! already parsed from the transport.

mod filter;

pub use filter::{Filter, TimeRange};

use serde::{Deserialize, Serialize};

/// Operator profile kind, content is a JSON object
pub const PROFILE_METADATA: u32 = 0;

/// Monitor announcement kind
pub const MONITOR_ANNOUNCEMENT: u32 = 10166;

/// Endpoint discovery kind, geotagged and keyed by the endpoint URL
pub const RELAY_DISCOVERY: u32 = 30166;

/// Endpoint metadata kind, keyed by the endpoint URL
pub const RELAY_META: u32 = 30066;

/// A record as published by a monitor or endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,

    /// Publisher identity
    pub pubkey: String,

    /// Unix timestamp in seconds
    #[serde(default)]
    pub created_at: i64,

    pub kind: u32,

    /// Ordered `[name, value, ...]` annotations
    #[serde(default)]
    pub tags: Vec<Vec<String>>,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub sig: String,
}

impl Event {
    pub fn new(pubkey: impl Into<String>, kind: u32) -> Self {
        Self {
            pubkey: pubkey.into(),
            kind,
            created_at: chrono::Utc::now().timestamp(),
            ..Default::default()
        }
    }

    /// Append a tag, builder style
    pub fn with_tag<I, S>(mut self, tag: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_tag(tag.into_iter().map(Into::into).collect());
        self
    }

    pub fn push_tag(&mut self, tag: Vec<String>) {
        self.tags.push(tag);
    }

    /// Drop every tag with the given name
    pub fn remove_tag(&mut self, name: &str) {
        self.tags.retain(|tag| !is_named(tag, name));
    }

    /// All tags with the given name, in order
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [String]> + 'a {
        self.tags.iter().filter(move |tag| is_named(tag, name)).map(Vec::as_slice)
    }

    /// First value of the first tag with the given name
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .filter(|tag| is_named(tag, name))
            .find_map(|tag| tag.get(1))
            .map(String::as_str)
    }

    /// First value of every tag with the given name
    pub fn tag_values(&self, name: &str) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|tag| is_named(tag, name))
            .filter_map(|tag| tag.get(1))
            .map(String::as_str)
            .collect()
    }

    /// Endpoint identifier of addressable records
    pub fn d_tag(&self) -> Option<&str> {
        self.tag_value("d")
    }
}

fn is_named(tag: &[String], name: &str) -> bool {
    tag.first().is_some_and(|first| first == name)
}
