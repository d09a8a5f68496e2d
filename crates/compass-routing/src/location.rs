//! Live location interface

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::pattern::split_segments;

/// Current path plus raw query string (without the leading `?`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub query: String,
}

impl Location {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    /// Parse `path?query#fragment`; the fragment is dropped
    pub fn parse(url: &str) -> Self {
        let url = url.split('#').next().unwrap_or_default();
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let path = if path.is_empty() { "/" } else { path };
        Self::new(path, query)
    }

    /// `path` alone for a clean location, else `path?query`
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// Reached without any explicit query string
    pub fn is_clean(&self) -> bool {
        self.query.is_empty()
    }

    pub fn segments(&self) -> Vec<&str> {
        split_segments(&self.path)
    }

    /// `/a/b` for `/a/b/c/...` when the path is deeper than `depth` segments
    pub fn parent_prefix(&self, depth: usize) -> Option<String> {
        let segments = self.segments();
        if segments.len() > depth {
            Some(format!("/{}", segments[..depth].join("/")))
        } else {
            None
        }
    }
}

/// Host-provided access to the live location.
///
/// `push` adds a history entry, `replace` overwrites the current one.
/// Every change must be published to subscribers.
pub trait LocationProvider: Send + Sync {
    fn current(&self) -> Location;

    fn push(&self, url: &str);

    fn replace(&self, url: &str);

    fn subscribe(&self) -> watch::Receiver<Location>;
}

/// History stack kept in memory, for tests and headless hosts
#[derive(Clone)]
pub struct MemoryLocation {
    history: Arc<RwLock<Vec<Location>>>,
    sender: Arc<watch::Sender<Location>>,
}

impl MemoryLocation {
    pub fn new(initial_url: &str) -> Self {
        let initial = Location::parse(initial_url);
        let (sender, _) = watch::channel(initial.clone());

        Self {
            history: Arc::new(RwLock::new(vec![initial])),
            sender: Arc::new(sender),
        }
    }

    /// Pop the current entry; returns false when already at the first entry
    pub fn back(&self) -> bool {
        let previous = {
            let mut history = self.history.write();
            if history.len() <= 1 {
                return false;
            }
            history.pop();
            history.last().cloned()
        };

        if let Some(location) = previous {
            self.publish(location);
        }
        true
    }

    pub fn history(&self) -> Vec<Location> {
        self.history.read().clone()
    }

    fn publish(&self, location: Location) {
        tracing::trace!(url = %location.url(), "Location changed");
        self.sender.send_replace(location);
    }
}

impl LocationProvider for MemoryLocation {
    fn current(&self) -> Location {
        self.history.read().last().cloned().unwrap_or_default()
    }

    fn push(&self, url: &str) {
        let location = Location::parse(url);
        self.history.write().push(location.clone());
        self.publish(location);
    }

    fn replace(&self, url: &str) {
        let location = Location::parse(url);
        {
            let mut history = self.history.write();
            match history.last_mut() {
                Some(top) => *top = location.clone(),
                None => history.push(location.clone()),
            }
        }
        self.publish(location);
    }

    fn subscribe(&self) -> watch::Receiver<Location> {
        self.sender.subscribe()
    }
}
