//! Response bodies for the HTTP service

use serde::Serialize;

/// Acknowledgement for an accepted webhook. Serializes to `{}`.
#[derive(Debug, Default, Serialize)]
pub struct WebhookAccepted {}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Description of the exposed API, served only in the `dev` environment.
#[derive(Debug, Serialize)]
pub struct DocsResponse {
    pub service: String,
    pub version: String,
    pub environment: String,
    pub signature_header: String,
    pub signature_algorithm: String,
    pub supported_events: Vec<String>,
    pub endpoints: Vec<EndpointDoc>,
}

#[derive(Debug, Serialize)]
pub struct EndpointDoc {
    pub method: String,
    pub path: String,
    pub description: String,
}

impl EndpointDoc {
    pub fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
        }
    }
}
