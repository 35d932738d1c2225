//! Route table binding host routes to backup event labels.
//!
//! The host calls [`EventRouter::handle`] from its response path. The backup runs on a
//! detached task and the response payload comes back untouched.

use crate::backup::{BackupOutcome, BackupWriter};
use crate::config::AutoBackupEvent;
use crate::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
pub struct EventRouter {
    routes: HashMap<String, String>,
    writer: Option<Arc<BackupWriter>>,
}

impl EventRouter {
    /// Router with no routes; every call passes the payload through
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register every configured event against `writer`
    pub fn new(events: &[AutoBackupEvent], writer: Arc<BackupWriter>) -> Self {
        let mut routes = HashMap::with_capacity(events.len());
        for event in events {
            if let Some(previous) = routes.insert(event.route.clone(), event.name.clone()) {
                warn!(
                    "Route {} was already bound to {}; {} replaces it",
                    event.route, previous, event.name
                );
            }
            info!(
                "Registered AutoBackupEvent: {} on route: {}",
                event.name, event.route
            );
        }

        Self {
            routes,
            writer: Some(writer),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Event label bound to `route`
    pub fn event_for(&self, route: &str) -> Option<&str> {
        self.routes.get(route).map(String::as_str)
    }

    /// Registered `(route, label)` pairs sorted by route
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut routes: Vec<(&str, &str)> = self
            .routes
            .iter()
            .map(|(route, name)| (route.as_str(), name.as_str()))
            .collect();
        routes.sort_unstable();
        routes
    }

    /// Host entry point. Starts the backup in the background and returns `output` as given,
    /// or an empty string when there is none.
    ///
    /// Outside a tokio runtime no backup runs; a warning is logged and the payload is still
    /// returned.
    pub fn handle(&self, route: &str, session_id: &str, output: Option<String>) -> String {
        // Detached: dropping the handle does not cancel the task
        drop(self.dispatch(route, session_id));
        output.unwrap_or_default()
    }

    /// Start the backup bound to `route` and hand back its task
    ///
    /// `None` when the route is unknown or the session id is malformed. Also `None` outside a
    /// tokio runtime.
    pub fn dispatch(&self, route: &str, session_id: &str) -> Option<JoinHandle<BackupOutcome>> {
        let Some(event) = self.routes.get(route) else {
            debug!("No AutoBackupEvent registered on route: {}", route);
            return None;
        };
        let writer = self.writer.as_ref()?;

        let session_id = match SessionId::parse(session_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("AutoBackupEvent {} skipped: {}", event, e);
                return None;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "AutoBackupEvent {} for session {} skipped: no async runtime to run the backup on",
                event, session_id
            );
            return None;
        };

        info!(
            "AutoBackupEvent {} triggered for session: {}",
            event, session_id
        );
        let writer = Arc::clone(writer);
        let event = event.clone();
        Some(runtime.spawn(async move {
            writer.backup(&event, &session_id).await
        }))
    }
}
