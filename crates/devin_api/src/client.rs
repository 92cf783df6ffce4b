use futures_util::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

use crate::attachments::AttachmentRecord;
use crate::config::DevinApiConfig;
use crate::error::{parse_error_message, DevinApiError};
use crate::multipart::{build_multipart_body, form_boundary, multipart_content_type};
use crate::payload::{CreateSessionRequest, CreateSessionResponse, SessionCreated};
use crate::url::{attachments_url, sessions_url};

#[derive(Debug, Clone)]
pub struct DevinApiClient {
    http: Client,
    config: DevinApiConfig,
}

impl DevinApiClient {
    pub fn new(config: DevinApiConfig) -> Result<Self, DevinApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(DevinApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &DevinApiConfig {
        &self.config
    }

    pub fn sessions_endpoint(&self) -> String {
        sessions_url(&self.config.base_url)
    }

    pub fn attachments_endpoint(&self) -> String {
        attachments_url(&self.config.base_url)
    }

    /// Bearer auth plus any configured extra headers.
    pub fn build_headers(&self) -> Result<HeaderMap, DevinApiError> {
        let api_key = self.config.api_key.trim();
        if api_key.is_empty() {
            return Err(DevinApiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                DevinApiError::InvalidHeader("api key is not a valid header value".to_owned())
            })?,
        );
        for (key, value) in &self.config.extra_headers {
            headers.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    DevinApiError::InvalidHeader(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(value).map_err(|_| {
                    DevinApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(headers)
    }

    pub fn build_session_request(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<reqwest::RequestBuilder, DevinApiError> {
        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.sessions_endpoint())
            .headers(headers)
            .json(&request.to_wire()))
    }

    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, DevinApiError> {
        tracing::info!(
            title = %request.title,
            tags = request.tags.len(),
            playbook = request.playbook_id.is_some(),
            "creating Devin session"
        );

        let response = self.build_session_request(request)?.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = parse_error_message(status, &body);
            tracing::warn!(
                status = status.as_u16(),
                message = %message,
                "session request rejected"
            );
            return Err(DevinApiError::Status(status, message));
        }

        let parsed = serde_json::from_str::<CreateSessionResponse>(&body).map_err(|error| {
            tracing::error!(body = %body, %error, "invalid Devin API response");
            DevinApiError::InvalidResponse(error.to_string())
        })?;
        Ok(parsed.into())
    }

    /// Downloads the attachment body, or returns the inline bytes when present.
    pub async fn fetch_attachment_bytes(
        &self,
        attachment: &AttachmentRecord,
    ) -> Result<Vec<u8>, DevinApiError> {
        if let Some(bytes) = &attachment.raw_bytes {
            return Ok(bytes.clone());
        }

        let response = self.http.get(&attachment.download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                file_name = %attachment.file_name,
                status = status.as_u16(),
                "failed to fetch attachment"
            );
            return Err(DevinApiError::AttachmentDownload {
                file_name: attachment.file_name.clone(),
                status,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    pub fn build_upload_request(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
        boundary: &str,
    ) -> Result<reqwest::RequestBuilder, DevinApiError> {
        let mut headers = self.build_headers()?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&multipart_content_type(boundary)).map_err(|_| {
                DevinApiError::InvalidHeader(format!("invalid multipart boundary: {boundary}"))
            })?,
        );

        let body = build_multipart_body(bytes, file_name, content_type, boundary);
        Ok(self
            .http
            .post(self.attachments_endpoint())
            .headers(headers)
            .body(body))
    }

    /// Uploads one attachment and returns the URL the service assigned to it.
    pub async fn upload_attachment(
        &self,
        attachment: &AttachmentRecord,
    ) -> Result<String, DevinApiError> {
        let bytes = self.fetch_attachment_bytes(attachment).await?;
        let boundary = form_boundary();
        let response = self
            .build_upload_request(
                &bytes,
                &attachment.file_name,
                &attachment.content_type,
                &boundary,
            )?
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(DevinApiError::AttachmentUpload { status, body });
        }

        let url = body.trim();
        if url.is_empty() {
            return Err(DevinApiError::EmptyUploadUrl);
        }
        tracing::debug!(file_name = %attachment.file_name, "attachment uploaded");
        Ok(url.to_owned())
    }

    /// Uploads all attachments concurrently, in input order.
    ///
    /// Fails on the first error; uploads still in flight are dropped with it.
    pub async fn upload_attachments(
        &self,
        attachments: &[AttachmentRecord],
    ) -> Result<Vec<String>, DevinApiError> {
        if attachments.is_empty() {
            return Ok(Vec::new());
        }
        try_join_all(
            attachments
                .iter()
                .map(|attachment| self.upload_attachment(attachment)),
        )
        .await
    }
}
