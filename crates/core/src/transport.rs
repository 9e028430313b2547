//! HTTP transport used by pinning backends
//!
//! Backends never talk to `reqwest` directly: they describe the request
//! (URL, headers, multipart or JSON body) and hand it to an [`HttpTransport`].
//! [`ReqwestTransport`] is the production implementation; tests substitute
//! their own.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Body of a single multipart field
#[derive(Debug, Clone, PartialEq)]
pub enum PartBody {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        data: Bytes,
    },
}

/// One named field of a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPart {
    pub name: String,
    pub body: PartBody,
}

/// A `multipart/form-data` request body, built up before sending
#[derive(Debug, Clone, Default)]
pub struct MultipartUpload {
    parts: Vec<UploadPart>,
}

impl MultipartUpload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file part
    pub fn add_file(
        &mut self,
        name: &str,
        file_name: String,
        content_type: String,
        data: Bytes,
    ) {
        self.parts.push(UploadPart {
            name: name.to_string(),
            body: PartBody::File {
                file_name,
                content_type,
                data,
            },
        });
    }

    /// Append a text part
    pub fn add_text(&mut self, name: &str, value: String) {
        self.parts.push(UploadPart {
            name: name.to_string(),
            body: PartBody::Text(value),
        });
    }

    pub fn parts(&self) -> &[UploadPart] {
        &self.parts
    }

    /// Number of file parts (text fields excluded)
    pub fn file_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p.body, PartBody::File { .. }))
            .count()
    }

    /// Total size of the file payloads in bytes
    pub fn total_bytes(&self) -> u64 {
        self.parts
            .iter()
            .map(|p| match &p.body {
                PartBody::File { data, .. } => data.len() as u64,
                PartBody::Text(_) => 0,
            })
            .sum()
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new();
        for part in self.parts {
            let field = match part.body {
                PartBody::Text(value) => Part::text(value),
                PartBody::File {
                    file_name,
                    content_type,
                    data,
                } => Part::bytes(data.to_vec())
                    .file_name(file_name)
                    .mime_str(&content_type)?,
            };
            form = form.part(part.name, field);
        }
        Ok(form)
    }
}

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as lossy UTF-8, for error messages
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Request/response service consumed by pinning backends
///
/// Implementations return `Err` only when no response was obtained at all;
/// status handling is left to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST a `multipart/form-data` body
    async fn post_multipart(
        &self,
        url: &str,
        headers: &HeaderMap,
        upload: MultipartUpload,
    ) -> Result<HttpResponse>;

    /// POST a JSON body
    async fn post_json(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// Create a transport, optionally bounding every request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!("pinpilot/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_multipart(
        &self,
        url: &str,
        headers: &HeaderMap,
        upload: MultipartUpload,
    ) -> Result<HttpResponse> {
        debug!(url, files = upload.file_count(), "POST multipart");
        let form = upload.into_form()?;

        let response = self
            .http_client
            .post(url)
            .headers(headers.clone())
            .multipart(form)
            .send()
            .await?;

        Self::read(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        debug!(url, "POST json");
        let response = self
            .http_client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await?;

        Self::read(response).await
    }
}
