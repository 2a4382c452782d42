use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use crate::domain::{ports::ChatBackend, Answer, ChatQuery, DomainError, UploadReceipt};

/// HTTP client for the `/upload-pdf` and `/chat` endpoints.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turns a non-200 response into a transport error carrying the body.
async fn ensure_ok(response: Response) -> Result<Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);

    Err(DomainError::transport(format!("{status}: {detail}")))
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn upload_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, DomainError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/upload-pdf"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?;

        let receipt: UploadReceipt = ensure_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::transport(format!("invalid upload response: {e}")))?;

        Ok(receipt.doc_id)
    }

    async fn chat(&self, query: &ChatQuery) -> Result<Answer, DomainError> {
        let response = self
            .http
            .post(self.url("/chat"))
            .json(query)
            .send()
            .await
            .map_err(|e| DomainError::transport(e.to_string()))?;

        ensure_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::transport(format!("invalid chat response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let client = ApiClient::new("http://127.0.0.1:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        assert_eq!(client.url("/chat"), "http://127.0.0.1:8000/chat");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client
            .chat(&ChatQuery::new("doc", "question"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Transport(_)));
    }
}
