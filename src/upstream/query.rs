//! Content API query construction and continuation merging.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::request::{PageSelector, RequestDescriptor};

/// Ordered upstream query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiQuery {
    params: BTreeMap<String, String>,
}

impl ApiQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first query for a validated request.
    ///
    /// Client-supplied extras go in first so the protocol keys always win.
    pub fn for_descriptor(descriptor: &RequestDescriptor) -> Self {
        let mut query = Self::new();
        for (key, value) in &descriptor.raw_query {
            query.set(key.clone(), value.clone());
        }

        query.set("action", "query");
        query.set("format", "json");
        query.set("prop", "pageprops");
        query.set("ppprop", "graph_specs");
        query.set("continue", "");

        match &descriptor.page {
            PageSelector::Revision(rev) => query.set("revids", rev.to_string()),
            PageSelector::Title(title) => query.set("titles", title.clone()),
        }

        query
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Query for the next page: this query with every continuation key
    /// replacing the current value.
    pub fn merge_continuation(&self, continuation: &Map<String, Value>) -> Self {
        let mut next = self.clone();
        for (key, value) in continuation {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            next.set(key.clone(), value);
        }
        next
    }
}
