//! services/client/src/adapters/testing.rs
//!
//! A scripted `HttpTransport` for exercising the client against canned answers.

use async_trait::async_trait;
use bytes::Bytes;
use price_analysis_core::ports::{ApiRequest, ApiResponse, HttpTransport, PortResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an answer for `path`. The last queued answer for a path keeps
    /// being served once the others are used up.
    pub fn respond(&self, path: &str, status: u16, body: impl Into<Bytes>) {
        self.script
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(ApiResponse {
                status,
                body: body.into(),
            });
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> PortResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let mut script = self.script.lock().unwrap();
        let answer = match script.get_mut(&request.path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(answer.unwrap_or(ApiResponse {
            status: 404,
            body: Bytes::from_static(br#"{"message":"Not Found"}"#),
        }))
    }
}
