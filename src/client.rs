use crate::error::ClauseGuardError;
use crate::stream::ProtocolEvents;
use crate::types::{AnalyzeRequest, ClientConfig, Document, ErrorBody, UploadedDocument};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Response body of the analysis call, as a stream of chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClauseGuardError>> + Send>>;

/// Stream of analysis events returned by [`AnalysisClient::analyze_stream`].
pub type AnalysisEvents = ProtocolEvents<BodyStream>;

/// HTTP transport for the upload and analysis calls.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    config: ClientConfig,
    http_client: Client,
}

impl AnalysisClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClauseGuardError> {
        Self::with_config(ClientConfig::new().base_url(base_url))
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, ClauseGuardError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a document and return the text extracted from it.
    pub async fn upload(
        &self,
        document: &Document,
        api_key: &str,
    ) -> Result<UploadedDocument, ClauseGuardError> {
        let url = self.config.endpoint(&self.config.upload_path);

        let file = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", api_key.to_string());

        debug!("Uploading {} ({} bytes) to {}", document.file_name, document.bytes.len(), url);

        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response, "Upload failed").await);
        }

        let data: UploadedDocument = response.json().await?;
        debug!("Extracted {} characters", data.text.chars().count());
        Ok(data)
    }

    /// Start an analysis of `text` and return its event stream.
    ///
    /// Resolves once the response headers arrive. Dropping the returned
    /// stream aborts the call.
    pub async fn analyze_stream(
        &self,
        text: &str,
        api_key: &str,
    ) -> Result<AnalysisEvents, ClauseGuardError> {
        let url = self.config.endpoint(&self.config.analyze_path);
        let request = AnalyzeRequest { text, api_key };

        debug!("Requesting analysis of {} characters at {}", text.chars().count(), url);

        let response = self
            .http_client
            .post(&url)
            .header("Accept", "application/x-ndjson")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response, "Analysis request failed").await);
        }

        let body: BodyStream =
            Box::pin(response.bytes_stream().map_err(ClauseGuardError::HttpError));
        Ok(ProtocolEvents::new(body, self.config.max_line_bytes))
    }
}

async fn api_error(response: Response, fallback: &str) -> ClauseGuardError {
    let status_code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message())
        .unwrap_or_else(|| fallback.to_string());
    ClauseGuardError::ApiError {
        status_code,
        message,
    }
}
