//! crates/price_analysis_core/src/auth/session.rs
//!
//! Owns the single active session and serializes access-token refreshes.
//!
//! At most one refresh call is in flight at any time. Callers that need a new
//! token while a refresh is running are parked on a oneshot channel and all of
//! them receive the outcome of that one refresh.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, error, info, warn};

use crate::domain::Session;
use crate::ports::{PortError, PortResult, SessionStore, TokenRefresher};

type RefreshWaiter = oneshot::Sender<PortResult<String>>;

enum RefreshState {
    Idle,
    Refreshing(Vec<RefreshWaiter>),
}

/// The token lifecycle manager shared by every outgoing request.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    session: RwLock<Option<Session>>,
    // Never held across an await point.
    refresh: Mutex<RefreshState>,
}

impl SessionManager {
    /// Creates a manager seeded with whatever session the store persisted.
    ///
    /// A restored session is trusted optimistically; its token is re-checked
    /// on the next request.
    pub async fn restore(
        store: Arc<dyn SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> PortResult<Self> {
        let session = store.load().await?;
        if let Some(session) = &session {
            info!(role = ?session.role, "Restored persisted session");
        }

        Ok(Self {
            store,
            refresher,
            session: RwLock::new(session),
            refresh: Mutex::new(RefreshState::Idle),
        })
    }

    pub async fn login(&self, session: Session) -> PortResult<()> {
        self.store.save(&session).await?;
        info!(role = ?session.role, "Session started");
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Ends the session in memory first, then in durable storage.
    pub async fn logout(&self) -> PortResult<()> {
        let had_session = self.session.write().await.take().is_some();
        if had_session {
            info!("Session ended");
        }
        self.store.clear().await
    }

    pub async fn current(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Whether a session exists whose access token has expired at `now`.
    pub async fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.is_expired_at(now))
    }

    /// Called after the server rejected `stale_token`.
    ///
    /// If another request already replaced that token, the current one is
    /// returned without refreshing again.
    pub async fn refresh_after_unauthorized(&self, stale_token: &str) -> PortResult<String> {
        match self.access_token().await {
            Some(current) if current != stale_token => {
                debug!("Access token was already renewed by another request");
                Ok(current)
            }
            _ => self.refresh_access_token().await,
        }
    }

    /// Obtains a new access token, joining an in-flight refresh if there is one.
    ///
    /// On failure the session is ended and every queued caller receives the error.
    pub async fn refresh_access_token(&self) -> PortResult<String> {
        let waiter = {
            let mut state = self.lock_refresh_state();
            match &mut *state {
                RefreshState::Refreshing(waiters) => {
                    let (sender, receiver) = oneshot::channel();
                    waiters.push(sender);
                    Some(receiver)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing(Vec::new());
                    None
                }
            }
        };

        if let Some(receiver) = waiter {
            debug!("Refresh already in flight, waiting for its outcome");
            return receiver.await.unwrap_or_else(|_| {
                Err(PortError::RefreshFailed(
                    "the in-flight refresh was abandoned".to_string(),
                ))
            });
        }

        let in_flight = InFlightRefresh::new(&self.refresh);
        let outcome = self.perform_refresh().await;

        match &outcome {
            Ok(_) => info!("Access token refreshed"),
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                if let Err(clear_error) = self.logout().await {
                    error!(error = %clear_error, "Failed to clear persisted session");
                }
            }
        }

        let waiters = in_flight.finish();
        if !waiters.is_empty() {
            debug!(waiters = waiters.len(), "Releasing requests queued behind the refresh");
        }
        for waiter in waiters {
            // A waiter whose request was dropped no longer listens.
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    async fn perform_refresh(&self) -> PortResult<String> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.refresh_token.clone())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| PortError::RefreshFailed("No refresh token available".to_string()))?;

        let refreshed = self
            .refresher
            .refresh(&refresh_token)
            .await
            .map_err(|e| match e {
                PortError::RefreshFailed(reason) => PortError::RefreshFailed(reason),
                other => PortError::RefreshFailed(other.to_string()),
            })?;

        let mut guard = self.session.write().await;
        let session = guard.as_mut().ok_or_else(|| {
            PortError::RefreshFailed("the session ended while refreshing".to_string())
        })?;
        session.access_token = refreshed.access_token.clone();
        session.access_token_expires_at = Session::expiry_after(Utc::now(), refreshed.expires_in);

        if let Err(e) = self.store.save(session).await {
            warn!(error = %e, "Refreshed token could not be persisted");
        }

        Ok(refreshed.access_token)
    }

    fn lock_refresh_state(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the refresh as running; returns the state to `Idle` when finished or dropped.
///
/// If the refreshing future is dropped midway the queued senders are dropped
/// with it, so every waiter wakes up with an error instead of hanging.
struct InFlightRefresh<'a> {
    state: &'a Mutex<RefreshState>,
    finished: bool,
}

impl<'a> InFlightRefresh<'a> {
    fn new(state: &'a Mutex<RefreshState>) -> Self {
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self) -> Vec<RefreshWaiter> {
        self.finished = true;
        take_waiters(self.state)
    }
}

impl Drop for InFlightRefresh<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Token refresh abandoned before completion");
            take_waiters(self.state);
        }
    }
}

fn take_waiters(state: &Mutex<RefreshState>) -> Vec<RefreshWaiter> {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    match std::mem::replace(&mut *state, RefreshState::Idle) {
        RefreshState::Refreshing(waiters) => waiters,
        RefreshState::Idle => Vec::new(),
    }
}
