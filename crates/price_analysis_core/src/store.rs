//! crates/price_analysis_core/src/store.rs
//!
//! An in-memory `SessionStore`, for embedding the client where nothing should
//! outlive the process.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::Session;
use crate::ports::{PortResult, SessionStore};

#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> PortResult<Option<Session>> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> PortResult<()> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        *self.session.lock().await = None;
        Ok(())
    }
}
