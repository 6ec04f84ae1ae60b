use crate::backend::InterviewBackend;
use crate::capture::{CaptureDevice, CaptureDeviceFactory, CaptureSourceConfig};
use crate::session::{SessionConfig, SessionHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live recording sessions (session_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,

    /// Interview, user and video services
    pub backend: Arc<dyn InterviewBackend>,

    /// Camera used for new sessions
    pub capture: CaptureSourceConfig,

    pub session: SessionConfig,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn InterviewBackend>,
        capture: CaptureSourceConfig,
        session: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            backend,
            capture,
            session,
        }
    }

    /// A fresh capture device for one session
    pub fn create_device(&self) -> Box<dyn CaptureDevice> {
        CaptureDeviceFactory::create(&self.capture, &self.session.mime_type)
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Register a session and forget it once it has been finished for a while
    pub async fn register(&self, handle: SessionHandle) {
        let session_id = handle.id().to_string();
        let retain = Duration::from_secs(self.session.retain_finished_secs);
        let sessions = Arc::clone(&self.sessions);
        let mut views = handle.subscribe();

        {
            let mut registered = sessions.write().await;
            registered.insert(session_id.clone(), handle);
        }

        tokio::spawn(async move {
            // The snapshot channel closes when the controller stops
            while views.changed().await.is_ok() {}
            tokio::time::sleep(retain).await;

            if sessions.write().await.remove(&session_id).is_some() {
                info!("Finished session {} evicted", session_id);
            }
        });
    }
}
