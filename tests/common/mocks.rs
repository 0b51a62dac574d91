use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ares_client::{AresError, Fetcher};

/// Fetcher serving canned responses, keyed by URL, without network calls
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    responses: Arc<Mutex<HashMap<String, ScriptedResponse>>>,
    request_log: Arc<Mutex<Vec<String>>>,
}

#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    Body(Vec<u8>),
    Status(u16),
    Timeout,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, url: &str, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn add_success_response(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.add_response(url, ScriptedResponse::Body(body.into()));
    }

    pub fn add_error_response(&self, url: &str, status: u16) {
        self.add_response(url, ScriptedResponse::Status(status));
    }

    pub fn add_timeout_response(&self, url: &str) {
        self.add_response(url, ScriptedResponse::Timeout);
    }

    pub fn get_request_log(&self) -> Vec<String> {
        self.request_log.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }

    pub fn clear_request_log(&self) {
        self.request_log.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AresError> {
        self.request_log.lock().unwrap().push(url.to_string());

        let response = {
            let responses = self.responses.lock().unwrap();
            responses.get(url).cloned()
        };

        match response {
            Some(ScriptedResponse::Body(body)) => Ok(body),
            Some(ScriptedResponse::Status(status)) => Err(AresError::HttpStatus {
                url: url.to_string(),
                status,
                message: format!("HTTP {}", status),
            }),
            Some(ScriptedResponse::Timeout) => Err(AresError::Timeout {
                url: url.to_string(),
                timeout_seconds: 30,
            }),
            // Default: not found
            None => Err(AresError::HttpStatus {
                url: url.to_string(),
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }
}
