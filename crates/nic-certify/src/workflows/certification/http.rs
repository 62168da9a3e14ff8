//! reqwest-backed adapter for [`CertificationApi`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::api::{ApiError, CertificationApi, StatusUpdate};
use super::domain::{Application, ApplicationId, AuditLogEntry, Document};
use super::signature::SignatureFile;
use crate::config::ApiConfig;

pub const SIGNATURE_FIELD: &str = "signatureFile";

/// Registry payload, either wrapped as `{ "data": ... }` or bare.
///
/// Decoded once here so nothing past the client boundary inspects response shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpCertificationApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCertificationApi {
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn application_path(id: &ApplicationId, suffix: &str) -> String {
        format!("/applications/{}{}", id.as_str(), suffix)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let response = check_response(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map(Envelope::into_inner)
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

async fn check_response(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull `message`/`error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl CertificationApi for HttpCertificationApi {
    async fn list_applications(&self) -> Result<Vec<Application>, ApiError> {
        self.send(self.client.get(self.url("/applications"))).await
    }

    async fn get_application_by_id(&self, id: &ApplicationId) -> Result<Application, ApiError> {
        let path = Self::application_path(id, "");
        self.send(self.client.get(self.url(&path))).await
    }

    async fn update_application_status(
        &self,
        id: &ApplicationId,
        update: &StatusUpdate,
    ) -> Result<Application, ApiError> {
        let path = Self::application_path(id, "/status");
        debug!(application_id = %id, status = %update.status, "recording status transition");
        self.send(self.client.patch(self.url(&path)).json(update)).await
    }

    async fn sign_application(
        &self,
        id: &ApplicationId,
        signature: &SignatureFile,
    ) -> Result<Application, ApiError> {
        let path = Self::application_path(id, "/sign");
        let part = Part::bytes(signature.bytes.clone())
            .file_name(signature.file_name.clone())
            .mime_str(&signature.content_type)?;
        let form = Form::new().part(SIGNATURE_FIELD, part);
        debug!(
            application_id = %id,
            bytes = signature.bytes.len(),
            "uploading signature"
        );
        self.send(self.client.post(self.url(&path)).multipart(form)).await
    }

    async fn get_documents_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<Document>, ApiError> {
        let path = Self::application_path(id, "/documents");
        self.send(self.client.get(self.url(&path))).await
    }

    async fn get_audit_logs_for_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AuditLogEntry>, ApiError> {
        let path = Self::application_path(id, "/audit-logs");
        self.send(self.client.get(self.url(&path))).await
    }
}
