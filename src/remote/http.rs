use std::sync::Mutex;

use serde::Serialize;

use super::entities::{profile_from_entities, EntitiesResponse};
use super::{EntitySource, RemoteError};
use crate::models::PatientProfile;
use crate::rules::GuidelineRules;

/// HTTP client for a medical entity-recognition service.
pub struct HttpEntitySource {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    rules: GuidelineRules,
}

impl HttpEntitySource {
    /// Create a client for the service at `base_url`. Every request is bounded
    /// by `timeout_secs`.
    pub fn new(base_url: &str, timeout_secs: u64, rules: &GuidelineRules) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
            rules: rules.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `<base>/health`. Any failure reads as unavailable.
    pub fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Entity service health probe failed");
                false
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> RemoteError {
        if e.is_connect() {
            RemoteError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            RemoteError::Timeout(self.timeout_secs)
        } else {
            RemoteError::HttpClient(e.to_string())
        }
    }
}

/// Request body for `POST <base>/entities`.
#[derive(Serialize)]
struct EntitiesRequest<'a> {
    text: &'a str,
}

impl EntitySource for HttpEntitySource {
    fn name(&self) -> &str {
        "http"
    }

    fn extract(&self, text: &str) -> Result<PatientProfile, RemoteError> {
        let url = format!("{}/entities", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EntitiesRequest { text })
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EntitiesResponse = response
            .json()
            .map_err(|e| RemoteError::ResponseParsing(e.to_string()))?;

        tracing::debug!(entities = parsed.entities.len(), "Entity service responded");
        Ok(profile_from_entities(&parsed.entities, &self.rules))
    }
}

/// Entity source for tests: returns a configured profile or failure and
/// counts calls.
pub struct MockEntitySource {
    outcome: Result<PatientProfile, RemoteError>,
    calls: Mutex<usize>,
}

impl MockEntitySource {
    pub fn new(profile: PatientProfile) -> Self {
        Self {
            outcome: Ok(profile),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(error: RemoteError) -> Self {
        Self {
            outcome: Err(error),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

impl EntitySource for MockEntitySource {
    fn name(&self) -> &str {
        "mock"
    }

    fn extract(&self, _text: &str) -> Result<PatientProfile, RemoteError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        self.outcome.clone()
    }
}
