use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BackendError, CaseBackend, DocumentUpload};
use crate::config::DashboardConfig;
use crate::models::{CanonicalChecklist, Case, CaseCreated};

/// HTTP client for the chargesheet processing API.
///
/// Only the connect phase has a deadline. Similarity scoring embeds the whole
/// narrative on the backend and can take a while on CPU.
pub struct HttpCaseBackend {
    base_url: String,
    client: reqwest::Client,
}

/// Request body for POST /compute-similarity
#[derive(Serialize)]
struct SimilarityRequest<'a> {
    document_text: &'a str,
    checklist: &'a CanonicalChecklist,
}

impl HttpCaseBackend {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, BackendError> {
        Self::new(&config.api_base, config.connect_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            BackendError::HttpClient("Request timed out".to_string())
        } else {
            BackendError::HttpClient(e.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }
}

#[async_trait]
impl CaseBackend for HttpCaseBackend {
    async fn upload_document(&self, upload: DocumentUpload) -> Result<CaseCreated, BackendError> {
        let part = reqwest::multipart::Part::bytes(upload.content)
            .file_name(upload.filename)
            .mime_str("application/pdf")
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::read_json(response).await
    }

    async fn list_cases(&self) -> Result<Vec<Case>, BackendError> {
        let response = self
            .client
            .get(self.url("/cases"))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::read_json(response).await
    }

    async fn get_case(&self, case_id: &str) -> Result<Case, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/cases/{case_id}")))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::read_json(response).await
    }

    async fn compute_similarity(
        &self,
        document_text: &str,
        checklist: &CanonicalChecklist,
    ) -> Result<CanonicalChecklist, BackendError> {
        let body = SimilarityRequest {
            document_text,
            checklist,
        };

        let response = self
            .client
            .post(self.url("/compute-similarity"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Self::read_json(response).await
    }
}
