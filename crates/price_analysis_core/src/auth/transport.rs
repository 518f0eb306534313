//! crates/price_analysis_core/src/auth/transport.rs
//!
//! The request interceptor. Wraps a raw `HttpTransport` and applies the token
//! lifecycle rules to every call:
//!
//! - an expired access token is refreshed before the request goes out,
//! - the current access token is attached as a bearer credential,
//! - a 401 on a request that carried a token triggers one refresh and one replay,
//! - a 402 ends the session without attempting a refresh,
//! - any other non-2xx status is returned as `PortError::Http`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::session::SessionManager;
use crate::ports::{ApiRequest, ApiResponse, HttpTransport, PortError, PortResult};

const UNAUTHORIZED: u16 = 401;
const PAYMENT_REQUIRED: u16 = 402;

#[derive(Clone)]
pub struct AuthenticatedTransport {
    inner: Arc<dyn HttpTransport>,
    sessions: Arc<SessionManager>,
}

impl AuthenticatedTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, sessions: Arc<SessionManager>) -> Self {
        Self { inner, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Sends `request` with the session's credentials and returns a 2xx response.
    pub async fn execute(&self, request: ApiRequest) -> PortResult<ApiResponse> {
        if self.sessions.needs_refresh(Utc::now()).await {
            debug!(request_id = %request.id, "Access token expired, refreshing before send");
            self.sessions.refresh_access_token().await?;
        }

        let token = self.sessions.access_token().await;
        let request = request.with_bearer(token);
        let response = self.send(&request).await?;

        if response.status == UNAUTHORIZED && !request.retry {
            if let Some(stale_token) = request.bearer.as_deref() {
                info!(request_id = %request.id, path = %request.path, "Access token rejected, refreshing");
                let token = self.sessions.refresh_after_unauthorized(stale_token).await?;

                let mut replay = request.with_bearer(Some(token));
                replay.retry = true;
                let response = self.send(&replay).await?;
                return self.settle(&replay, response).await;
            }
        }

        self.settle(&request, response).await
    }

    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse> {
        debug!(
            request_id = %request.id,
            path = %request.path,
            retry = request.retry,
            authenticated = request.bearer.is_some(),
            "Sending request"
        );
        let response = self.inner.send(request).await?;
        debug!(request_id = %request.id, status = response.status, "Received response");
        Ok(response)
    }

    async fn settle(&self, request: &ApiRequest, response: ApiResponse) -> PortResult<ApiResponse> {
        match response.status {
            status if (200..300).contains(&status) => Ok(response),
            PAYMENT_REQUIRED => {
                warn!(request_id = %request.id, "Subscription expired, ending session");
                if let Err(e) = self.sessions.logout().await {
                    error!(error = %e, "Failed to clear persisted session");
                }
                Err(PortError::SubscriptionExpired)
            }
            UNAUTHORIZED if request.bearer.is_some() => {
                warn!(request_id = %request.id, retry = request.retry, "Request rejected as unauthorized");
                Err(PortError::Unauthorized)
            }
            status => Err(PortError::Http {
                status,
                message: response.text(),
            }),
        }
    }
}
