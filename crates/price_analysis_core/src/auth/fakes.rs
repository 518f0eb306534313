//! Scripted stand-ins for the HTTP and refresh ports, used by the auth tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Barrier;

use crate::domain::{RefreshedToken, Role, Session};
use crate::ports::{ApiRequest, ApiResponse, HttpTransport, PortError, PortResult, TokenRefresher};

pub const EXPIRED_PLAN_PATH: &str = "/subscription/check";

pub fn session(access_token: &str, valid_for: Duration) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: "refresh-token".to_string(),
        role: Role::User,
        email: Some("buyer@example.com".to_string()),
        access_token_expires_at: Utc::now() + valid_for,
    }
}

pub fn response(status: u16, body: &str) -> ApiResponse {
    ApiResponse {
        status,
        body: Bytes::from(body.to_string()),
    }
}

pub struct FakeRefresher {
    calls: AtomicUsize,
    token: Option<String>,
    lifetime: Duration,
    delay: std::time::Duration,
}

impl FakeRefresher {
    pub fn succeeding(token: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            token: Some(token.to_string()),
            lifetime: Duration::minutes(15),
            delay: std::time::Duration::from_millis(20),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            token: None,
            lifetime: Duration::minutes(15),
            delay: std::time::Duration::from_millis(20),
        }
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for FakeRefresher {
    async fn refresh(&self, _refresh_token: &str) -> PortResult<RefreshedToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.token {
            Some(token) => Ok(RefreshedToken {
                access_token: token.clone(),
                expires_in: self.lifetime,
            }),
            None => Err(PortError::Http {
                status: 401,
                message: "refresh token expired".to_string(),
            }),
        }
    }
}

/// Accepts exactly one bearer token; everything else is a 401.
///
/// Requests carrying a rejected token can be held at a barrier so that
/// several of them observe their 401 before any refresh completes.
pub struct FakeApi {
    valid_token: String,
    stale_barrier: Option<Barrier>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl FakeApi {
    pub fn accepting(valid_token: &str) -> Self {
        Self {
            valid_token: valid_token.to_string(),
            stale_barrier: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stale_barrier(mut self, parties: usize) -> Self {
        self.stale_barrier = Some(Barrier::new(parties));
        self
    }

    pub fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeApi {
    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse> {
        self.seen.lock().unwrap().push(request.clone());

        if request.path == EXPIRED_PLAN_PATH {
            return Ok(response(402, r#"{"message":"Subscription expired"}"#));
        }

        match request.bearer.as_deref() {
            Some(token) if token == self.valid_token => Ok(response(200, "ok")),
            Some(_) => {
                if let Some(barrier) = &self.stale_barrier {
                    barrier.wait().await;
                }
                Ok(response(401, ""))
            }
            None => Ok(response(401, r#"{"message":"Bad credentials"}"#)),
        }
    }
}

/// A transport whose every call fails before reaching the server.
pub struct UnreachableApi;

#[async_trait]
impl HttpTransport for UnreachableApi {
    async fn send(&self, _request: &ApiRequest) -> PortResult<ApiResponse> {
        Err(PortError::Transport("connection refused".to_string()))
    }
}
