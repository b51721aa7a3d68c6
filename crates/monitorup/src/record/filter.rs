use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Query filter understood by the transport.
///
/// Indexed tag constraints are stored under `#<name>` keys and serialised
/// inline with the other fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u32>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(flatten)]
    pub tags: BTreeMap<String, Vec<String>>,
}

/// Time bounds split off a filter for paginated fetching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub since: Option<i64>,
    pub until: Option<i64>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u32>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn authors<S: Into<String>>(mut self, authors: impl IntoIterator<Item = S>) -> Self {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: i64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Constrain an indexed tag; `name` is given without the leading `#`
    pub fn tag<S: Into<String>>(mut self, name: &str, values: impl IntoIterator<Item = S>) -> Self {
        self.tags.insert(format!("#{name}"), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn tag_values(&self, name: &str) -> Option<&[String]> {
        self.tags.get(&format!("#{name}")).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overlay `other` onto `self`: every field set in `other` wins, tag keys
    /// are replaced one by one.
    pub fn merge(mut self, other: Filter) -> Filter {
        if other.kinds.is_some() {
            self.kinds = other.kinds;
        }
        if other.authors.is_some() {
            self.authors = other.authors;
        }
        if other.since.is_some() {
            self.since = other.since;
        }
        if other.until.is_some() {
            self.until = other.until;
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        self.tags.extend(other.tags);
        self
    }

    /// Remove `since`/`until` from the filter and return them
    pub fn take_time_range(&mut self) -> TimeRange {
        TimeRange { since: self.since.take(), until: self.until.take() }
    }
}
