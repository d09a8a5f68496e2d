//! Location sync controller

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use compass_routing::{split_segments, Location, LocationProvider};
use compass_session::NavigationStateStore;

/// Depth of the parent prefix that remembers its last visited child
pub const PARENT_PREFIX_DEPTH: usize = 2;

/// How long the restore reaction stays blocked after rewriting the location
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Location rewrite performed by the restore reaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "url")]
pub enum RestoreAction {
    /// Same path, saved query string put back
    RestoreParams(String),
    /// Parent path redirected to its last visited child
    ResumeChild(String),
}

impl RestoreAction {
    pub fn url(&self) -> &str {
        match self {
            RestoreAction::RestoreParams(url) | RestoreAction::ResumeChild(url) => url,
        }
    }
}

/// Keeps the state store in sync with the live location.
///
/// Must be driven from inside a Tokio runtime: releasing the `restoring`
/// flag is a spawned timer.
pub struct LocationSyncController {
    location: Arc<dyn LocationProvider>,
    store: NavigationStateStore,
    restoring: Arc<AtomicBool>,
    /// Path seen by the previous change; the restore reaction keys on it
    last_path: Mutex<Option<String>>,
    settle_delay: Duration,
}

impl LocationSyncController {
    pub fn new(location: Arc<dyn LocationProvider>, store: NavigationStateStore) -> Self {
        Self {
            location,
            store,
            restoring: Arc::new(AtomicBool::new(false)),
            last_path: Mutex::new(None),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring.load(Ordering::SeqCst)
    }

    /// React to one observed location.
    ///
    /// The restore reaction reads the store before the save reaction
    /// overwrites this path's entry with the (possibly empty) live query.
    pub fn handle_change(&self, location: &Location) -> Option<RestoreAction> {
        let action = self.restore_on_path_change(location);
        self.save_location(location);
        action
    }

    /// Drive the controller from the provider's change feed until it closes
    pub async fn run(&self) {
        let mut changes = self.location.subscribe();

        let initial = changes.borrow_and_update().clone();
        self.handle_change(&initial);

        while changes.changed().await.is_ok() {
            let location = changes.borrow_and_update().clone();
            self.handle_change(&location);
        }

        tracing::debug!("Location feed closed, sync controller stopped");
    }

    /// Save reaction: runs for every change and never navigates
    fn save_location(&self, location: &Location) {
        self.store
            .save_location_params(&location.path, &location.query);

        if let Some(parent) = location.parent_prefix(PARENT_PREFIX_DEPTH) {
            self.store.save_last_visited_child(&parent, &location.url());
        }
    }

    /// Restore reaction: runs only when the path portion changed
    fn restore_on_path_change(&self, location: &Location) -> Option<RestoreAction> {
        let path_changed = {
            let mut last_path = self.last_path.lock();
            let changed = last_path.as_deref() != Some(location.path.as_str());
            *last_path = Some(location.path.clone());
            changed
        };

        if !path_changed || self.is_restoring() || !location.is_clean() {
            return None;
        }

        let action = self.find_restore_target(location)?;

        self.restoring.store(true, Ordering::SeqCst);
        tracing::info!(from = %location.path, to = %action.url(), "Restoring location");
        self.location.replace(action.url());
        self.release_after_settle();

        Some(action)
    }

    fn find_restore_target(&self, location: &Location) -> Option<RestoreAction> {
        if let Some(query) = self
            .store
            .restore_location_params(&location.path)
            .filter(|query| !query.is_empty())
        {
            return Some(RestoreAction::RestoreParams(format!(
                "{}?{}",
                location.path, query
            )));
        }

        let segments = split_segments(&location.path);
        if segments.len() != PARENT_PREFIX_DEPTH {
            return None;
        }

        let parent = format!("/{}", segments.join("/"));
        self.store
            .restore_last_visited_child(&parent)
            .map(RestoreAction::ResumeChild)
    }

    // Timer-based: a navigation that settles slower than the delay can
    // re-trigger the restore reaction.
    fn release_after_settle(&self) {
        let restoring = Arc::clone(&self.restoring);
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            restoring.store(false, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_routing::MemoryLocation;
    use pretty_assertions::assert_eq;

    fn controller(url: &str) -> (LocationSyncController, MemoryLocation, NavigationStateStore) {
        let location = MemoryLocation::new(url);
        let store = NavigationStateStore::in_memory();
        let controller = LocationSyncController::new(Arc::new(location.clone()), store.clone());
        (controller, location, store)
    }

    /// Navigate and feed the controller, the way a router subscription would
    fn visit(
        controller: &LocationSyncController,
        location: &MemoryLocation,
        url: &str,
    ) -> Option<RestoreAction> {
        location.push(url);
        controller.handle_change(&location.current())
    }

    async fn settle() {
        tokio::time::sleep(DEFAULT_SETTLE_DELAY + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_reaction_records_params_and_child() {
        let (controller, location, store) = controller("/home");

        visit(&controller, &location, "/admin/templates/7/manage?tab=editor");

        assert_eq!(
            store
                .restore_location_params("/admin/templates/7/manage")
                .as_deref(),
            Some("tab=editor")
        );
        assert_eq!(
            store.restore_last_visited_child("/admin/templates").as_deref(),
            Some("/admin/templates/7/manage?tab=editor")
        );
        assert!(store.restore_last_visited_child("/admin").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_navigation_restores_saved_query() {
        let (controller, location, _) = controller("/home");

        assert_eq!(visit(&controller, &location, "/admin/categories?tab=deleted"), None);
        assert_eq!(visit(&controller, &location, "/admin/users"), None);

        let action = visit(&controller, &location, "/admin/categories");
        assert_eq!(
            action,
            Some(RestoreAction::RestoreParams(
                "/admin/categories?tab=deleted".to_string()
            ))
        );
        assert_eq!(location.current().url(), "/admin/categories?tab=deleted");
        assert!(controller.is_restoring());

        // the rewrite itself only changes the query
        assert_eq!(controller.handle_change(&location.current()), None);

        settle().await;
        assert!(!controller.is_restoring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_query_is_left_alone() {
        let (controller, location, _) = controller("/home");

        visit(&controller, &location, "/admin/categories?tab=deleted");
        visit(&controller, &location, "/admin/users");

        assert_eq!(visit(&controller, &location, "/admin/categories?tab=active"), None);
        assert_eq!(location.current().query, "tab=active");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_only_change_does_not_restore() {
        let (controller, location, store) = controller("/home");

        visit(&controller, &location, "/admin/categories?tab=deleted");
        assert_eq!(visit(&controller, &location, "/admin/categories"), None);
        assert_eq!(
            store.restore_location_params("/admin/categories").as_deref(),
            Some("")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_resumes_last_visited_child() {
        let (controller, location, _) = controller("/home");

        visit(&controller, &location, "/admin/templates/7/manage");
        let action = visit(&controller, &location, "/admin/templates");

        assert_eq!(
            action,
            Some(RestoreAction::ResumeChild(
                "/admin/templates/7/manage".to_string()
            ))
        );
        assert_eq!(location.current().path, "/admin/templates/7/manage");

        // arriving at the child is a path change, but the flag holds it off
        assert_eq!(controller.handle_change(&location.current()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_snapshot_wins_over_child() {
        let (controller, location, _) = controller("/home");

        visit(&controller, &location, "/admin/templates?view=grid");
        visit(&controller, &location, "/admin/templates/7/manage");
        settle().await;

        let action = visit(&controller, &location, "/admin/templates");
        assert_eq!(
            action,
            Some(RestoreAction::RestoreParams(
                "/admin/templates?view=grid".to_string()
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restoring_flag_blocks_until_settled() {
        let (controller, location, _) = controller("/home");

        visit(&controller, &location, "/a/b?x=1");
        visit(&controller, &location, "/c/d?y=2");
        visit(&controller, &location, "/g/h?z=3");
        visit(&controller, &location, "/e");

        assert!(visit(&controller, &location, "/a/b").is_some());
        assert_eq!(visit(&controller, &location, "/c/d"), None);

        settle().await;
        assert_eq!(
            visit(&controller, &location, "/g/h"),
            Some(RestoreAction::RestoreParams("/g/h?z=3".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_follows_location_feed() {
        let location = MemoryLocation::new("/home");
        let store = NavigationStateStore::in_memory();
        let controller = Arc::new(LocationSyncController::new(
            Arc::new(location.clone()),
            store.clone(),
        ));

        let runner = Arc::clone(&controller);
        let task = tokio::spawn(async move { runner.run().await });

        location.push("/admin/categories?tab=deleted");
        tokio::time::sleep(Duration::from_millis(1)).await;
        location.push("/admin/users");
        tokio::time::sleep(Duration::from_millis(1)).await;
        location.push("/admin/categories");
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(location.current().url(), "/admin/categories?tab=deleted");
        assert_eq!(
            store.restore_location_params("/admin/categories").as_deref(),
            Some("tab=deleted")
        );

        task.abort();
    }
}
