//! services/client/src/adapters/refresh.rs
//!
//! Implements the `TokenRefresher` port against `POST /auth/refresh`.
//!
//! The call goes through the raw transport, never through the authenticated
//! one, so a failing refresh cannot recurse into another refresh.

use async_trait::async_trait;
use price_analysis_core::domain::RefreshedToken;
use price_analysis_core::ports::{
    ApiRequest, HttpTransport, PortError, PortResult, TokenRefresher,
};
use std::sync::Arc;

use crate::adapters::wire::{server_message, RefreshRequest, RefreshResponse};

pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Clone)]
pub struct HttpTokenRefresher {
    transport: Arc<dyn HttpTransport>,
}

impl HttpTokenRefresher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> PortResult<RefreshedToken> {
        let body = serde_json::to_string(&RefreshRequest { refresh_token })
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let response = self
            .transport
            .send(&ApiRequest::post_json(REFRESH_PATH, body))
            .await?;

        if response.status != 200 {
            let text = response.text();
            return Err(PortError::Http {
                status: response.status,
                message: server_message(&text).unwrap_or(text),
            });
        }

        serde_json::from_slice::<RefreshResponse>(&response.body)
            .map(RefreshResponse::to_domain)
            .map_err(|e| PortError::Decode(format!("refresh response: {}", e)))
    }
}
