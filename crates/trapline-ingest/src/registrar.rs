//! Catalog registration.
//!
//! The catalog is the source of truth: a record is registered before any
//! fan-out, and a rejected record must never reach the serving bucket.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use trapline_core::ImageRecord;

const CREATE_IMAGE_MUTATION: &str = "\
mutation CreateImageRecord($input: CreateImageInput!) {
    createImage(input: $input) {
        image {
            _id
        }
    }
}";

/// One structured error returned by the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogError {
    pub message: String,
    /// Machine-readable code; selects the dead-letter sub-directory.
    pub code: Option<String>,
}

/// Registration failed: exhausted transport or catalog-side rejection.
#[derive(Debug, Error)]
#[error("Registration failed with {} error(s)", errors.len())]
pub struct RegistrationFailure {
    pub errors: Vec<CatalogError>,
}

impl RegistrationFailure {
    /// A failure with no catalog-side structure (e.g. transport exhausted).
    pub fn transport(message: String) -> Self {
        Self {
            errors: vec![CatalogError {
                message,
                code: None,
            }],
        }
    }
}

/// Injected catalog mutation endpoint.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Submit the record; returns the catalog-assigned image id.
    async fn create_image(&self, record: &ImageRecord) -> Result<String, RegistrationFailure>;
}

/// Production client posting the registration mutation over HTTP.
pub struct GraphqlCatalogClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    max_retries: u32,
}

impl GraphqlCatalogClient {
    pub fn new(api_url: String, api_key: String, max_retries: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            max_retries,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<CreateImageData>,
    errors: Option<Vec<GraphqlResponseError>>,
}

#[derive(Debug, Deserialize)]
struct CreateImageData {
    #[serde(rename = "createImage")]
    create_image: Option<CreateImagePayload>,
}

#[derive(Debug, Deserialize)]
struct CreateImagePayload {
    image: Option<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponseError {
    message: String,
    extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorExtensions {
    code: Option<String>,
}

impl From<GraphqlResponseError> for CatalogError {
    fn from(err: GraphqlResponseError) -> Self {
        CatalogError {
            message: err.message,
            code: err.extensions.and_then(|e| e.code),
        }
    }
}

/// Exponential backoff for transient transport failures.
#[inline]
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt.min(4))
}

#[async_trait]
impl CatalogClient for GraphqlCatalogClient {
    async fn create_image(&self, record: &ImageRecord) -> Result<String, RegistrationFailure> {
        let body = serde_json::json!({
            "query": CREATE_IMAGE_MUTATION,
            "variables": { "input": { "md": record } },
        });

        let mut last_transport_error = String::new();

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(retry_backoff(attempt - 1)).await;
            }

            let response = match self
                .http
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "Catalog request failed in transport"
                    );
                    last_transport_error = e.to_string();
                    continue;
                }
            };

            if response.status().is_server_error() {
                tracing::warn!(
                    status = %response.status(),
                    attempt = attempt + 1,
                    max_retries = self.max_retries,
                    "Catalog returned a server error"
                );
                last_transport_error = format!("server error: {}", response.status());
                continue;
            }

            let parsed: GraphqlResponse = response.json().await.map_err(|e| {
                RegistrationFailure::transport(format!("unparseable catalog response: {}", e))
            })?;

            if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
                return Err(RegistrationFailure {
                    errors: errors.into_iter().map(CatalogError::from).collect(),
                });
            }

            let id = parsed
                .data
                .and_then(|d| d.create_image)
                .and_then(|p| p.image)
                .map(|i| i.id)
                .ok_or_else(|| {
                    RegistrationFailure::transport(
                        "catalog response carried neither an image id nor errors".to_string(),
                    )
                })?;

            return Ok(id);
        }

        Err(RegistrationFailure::transport(format!(
            "transport exhausted after {} attempts: {}",
            self.max_retries, last_transport_error
        )))
    }
}
