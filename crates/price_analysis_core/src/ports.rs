//! crates/price_analysis_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the concrete HTTP client and storage mechanism.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::domain::{RefreshedToken, Session};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// It is `Clone` so that a single refresh outcome can be handed to every
/// request that was queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Subscription expired")]
    SubscriptionExpired,
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Transport Request / Response
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// An already serialized JSON document.
    Json(String),
    /// A single-file multipart form.
    Multipart {
        field: String,
        file_name: String,
        bytes: Bytes,
    },
}

/// A transport-agnostic description of one API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
    /// Set once the request has been replayed after a token refresh.
    pub retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, body: RequestBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            bearer: None,
            body,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, RequestBody::Empty)
    }

    pub fn post_json(path: impl Into<String>, json: String) -> Self {
        Self::new(Method::Post, path, RequestBody::Json(json))
    }

    pub fn post_file(path: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        Self::new(
            Method::Post,
            path,
            RequestBody::Multipart {
                field: "file".to_string(),
                file_name: file_name.into(),
                bytes,
            },
        )
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and returns whatever status the server answered with.
    ///
    /// Only failures to obtain a response at all are reported as errors.
    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse>;
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> PortResult<RefreshedToken>;
}

/// Durable storage for the single active session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> PortResult<Option<Session>>;

    async fn save(&self, session: &Session) -> PortResult<()>;

    async fn clear(&self) -> PortResult<()>;
}
