//! services/client/src/adapters/session_file.rs
//!
//! A `SessionStore` that persists the session as a small JSON document on disk.
//!
//! The document keeps the same independent keys a browser client keeps in local
//! storage (`user`, `isAuth`, `isAdmin`, `tokenExpiration`); they are all removed
//! together on logout.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use price_analysis_core::domain::Session;
use price_analysis_core::ports::{PortError, PortResult, SessionStore};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::adapters::wire::SessionRecord;

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PersistedAuth {
    #[serde(default)]
    user: Option<SessionRecord>,
    #[serde(default)]
    is_auth: bool,
    #[serde(default)]
    is_admin: bool,
    /// Access token expiry, epoch milliseconds.
    #[serde(default)]
    token_expiration: Option<i64>,
}

impl PersistedAuth {
    fn from_domain(session: &Session) -> Self {
        Self {
            user: Some(SessionRecord {
                access_token: session.access_token.clone(),
                refresh_token: session.refresh_token.clone(),
                role: session.role.into(),
                email: session.email.clone(),
            }),
            is_auth: true,
            is_admin: session.is_admin(),
            token_expiration: Some(session.access_token_expires_at.timestamp_millis()),
        }
    }

    fn to_domain(self) -> Option<Session> {
        if !self.is_auth {
            return None;
        }
        let user = self.user?;
        let access_token_expires_at = self
            .token_expiration
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Some(Session {
            access_token: user.access_token,
            refresh_token: user.refresh_token,
            role: user.role.into(),
            email: user.email,
            access_token_expires_at,
        })
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone, Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, e: impl std::fmt::Display) -> PortError {
        PortError::Storage(format!("failed to {} {}: {}", action, self.path.display(), e))
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> PortResult<Option<Session>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error("read", e)),
        };

        match serde_json::from_str::<PersistedAuth>(&contents) {
            Ok(persisted) => Ok(persisted.to_domain()),
            Err(e) => {
                // An unreadable session is treated like no session at all.
                warn!(path = %self.path.display(), error = %e, "Ignoring malformed session file");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_error("create directory for", e))?;
        }

        let json = serde_json::to_vec_pretty(&PersistedAuth::from_domain(session))
            .map_err(|e| self.storage_error("encode", e))?;

        // Write-then-rename so a crash never leaves a half-written session.
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| self.storage_error("write", e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.storage_error("replace", e))?;

        debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    async fn clear(&self) -> PortResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error("remove", e)),
        }
    }
}
