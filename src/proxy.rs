#![cfg(feature = "web")]

use std::future::Future;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use log::{error, info, warn};
use serde_json::Value;

use crate::app::AppState;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};

/// Header the backend reads the admin credential from.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Name of the multipart field carrying the uploaded report.
pub const FILE_FIELD: &str = "file";

const SYNC_PATH: &str = "/expenses/admin/sync";
const UPLOAD_PATH: &str = "/recon/upload";
const RECON_DRY_RUN_PATH: &str = "/recon/upload?dry_run=true";

/// A file pulled out of the browser's multipart body.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForwardBody {
    /// No body; sent with a JSON content type.
    Empty,
    /// Re-sent as a single multipart `file` field.
    File(UploadFile),
    /// The browser's body, passed through byte for byte with its own content type.
    Raw { content_type: String, bytes: Bytes },
}

/// One outbound POST to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRequest {
    pub url: String,
    pub admin_token: Option<String>,
    pub body: ForwardBody,
}

/// Raw backend answer, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Carries a forward to the backend.
///
/// Implementations return `Err` only when no response was obtained at all;
/// any HTTP status, success or not, comes back as `Ok`.
pub trait Transport: Send + Sync + 'static {
    fn forward(
        &self,
        request: ForwardRequest,
    ) -> impl Future<Output = std::result::Result<ForwardResponse, String>> + Send;
}

/// `reqwest`-backed transport used by the server.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Transport for HttpTransport {
    async fn forward(
        &self,
        request: ForwardRequest,
    ) -> std::result::Result<ForwardResponse, String> {
        let mut builder = self.http.post(&request.url);
        if let Some(token) = &request.admin_token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }

        builder = match request.body {
            ForwardBody::Empty => builder.header(reqwest::header::CONTENT_TYPE, "application/json"),
            ForwardBody::File(file) => {
                let mut part =
                    reqwest::multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
                if let Some(content_type) = &file.content_type {
                    part = part.mime_str(content_type).map_err(|e| e.to_string())?;
                }
                builder.multipart(reqwest::multipart::Form::new().part(FILE_FIELD, part))
            }
            ForwardBody::Raw {
                content_type,
                bytes,
            } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes),
        };

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(ForwardResponse { status, body })
    }
}

/// A backend success, relayed to the browser unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Relayed {
    pub status: u16,
    pub body: Value,
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self.body)).into_response()
    }
}

/// Which backend endpoint an uploaded report goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// `/recon/upload`; the credential is attached only when the deployment asks for it.
    Upload,
    /// `/recon/upload?dry_run=true`; always authenticated.
    ReconDryRun,
}

impl UploadTarget {
    fn path(self) -> &'static str {
        match self {
            UploadTarget::Upload => UPLOAD_PATH,
            UploadTarget::ReconDryRun => RECON_DRY_RUN_PATH,
        }
    }

    fn requires_token(self, config: &DashboardConfig) -> bool {
        match self {
            UploadTarget::Upload => config.upload_requires_token,
            UploadTarget::ReconDryRun => true,
        }
    }
}

fn required_token(config: &DashboardConfig) -> Result<String> {
    config
        .admin_token
        .clone()
        .ok_or_else(DashboardError::token_not_configured)
}

/// Forwards a sync request to the backend and interprets the answer
///
/// # Arguments
/// * `transport` - Carrier for the outbound POST
/// * `config` - Supplies the backend base URL and the admin token
///
/// # Returns
/// * The backend's status and JSON body on a 2xx answer
/// * `Configuration` without any outbound call when the token is unset,
///   otherwise `Upstream`, `Transport` or `Decode` as the answer dictates
pub async fn trigger_sync<T: Transport>(transport: &T, config: &DashboardConfig) -> Result<Relayed> {
    let token = required_token(config)?;
    let request = ForwardRequest {
        url: format!("{}{}", config.backend_base, SYNC_PATH),
        admin_token: Some(token),
        body: ForwardBody::Empty,
    };

    info!("Forwarding sync to {}", request.url);
    relay(transport, request, "Sync failed").await
}

fn upload_request(
    config: &DashboardConfig,
    target: UploadTarget,
    body: ForwardBody,
) -> Result<ForwardRequest> {
    let admin_token = if target.requires_token(config) {
        Some(required_token(config)?)
    } else {
        None
    };

    Ok(ForwardRequest {
        url: format!("{}{}", config.backend_base, target.path()),
        admin_token,
        body,
    })
}

/// Passes a browser's multipart body through to the backend unmodified
///
/// The body must be multipart and non-empty. File type checks belong to the
/// backend.
///
/// # Arguments
/// * `transport` - Carrier for the outbound POST
/// * `config` - Supplies the backend base URL, the token and the token policy
/// * `content_type` - The browser's `Content-Type`, boundary included
/// * `body` - The raw request body
/// * `target` - Plain upload or authenticated dry run
///
/// # Returns
/// * The backend's status and JSON body on a 2xx answer, or the same error
///   mapping as [`trigger_sync`] with the "Upload failed" prefix
pub async fn forward_multipart<T: Transport>(
    transport: &T,
    config: &DashboardConfig,
    content_type: Option<&str>,
    body: Bytes,
    target: UploadTarget,
) -> Result<Relayed> {
    let content_type = content_type
        .filter(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .ok_or_else(|| {
            DashboardError::Validation("Expected a multipart/form-data body".to_string())
        })?;
    if body.is_empty() {
        return Err(DashboardError::Validation("No file provided".to_string()));
    }

    let request = upload_request(
        config,
        target,
        ForwardBody::Raw {
            content_type: content_type.to_string(),
            bytes: body,
        },
    )?;

    info!("Forwarding upload to {}", request.url);
    relay(transport, request, "Upload failed").await
}

/// Forwards a single uploaded CSV, as submitted by the page's upload form
///
/// # Arguments
/// * `transport` - Carrier for the outbound POST
/// * `config` - Supplies the backend base URL, the token and the token policy
/// * `file` - The file extracted from the form
/// * `target` - Plain upload or authenticated dry run
///
/// # Returns
/// * `Validation` without any outbound call when the name does not end in
///   `.csv`, otherwise the same mapping as [`forward_multipart`]
pub async fn forward_upload<T: Transport>(
    transport: &T,
    config: &DashboardConfig,
    file: UploadFile,
    target: UploadTarget,
) -> Result<Relayed> {
    validate_csv_name(&file.file_name)?;
    let request = upload_request(config, target, ForwardBody::File(file))?;

    info!("Forwarding upload to {}", request.url);
    relay(transport, request, "Upload failed").await
}

async fn relay<T: Transport>(
    transport: &T,
    request: ForwardRequest,
    failure_prefix: &str,
) -> Result<Relayed> {
    let response = match transport.forward(request).await {
        Ok(response) => response,
        Err(detail) => {
            error!("Backend unreachable: {}", detail);
            return Err(DashboardError::Transport(detail));
        }
    };

    if !(200..300).contains(&response.status) {
        let text = String::from_utf8_lossy(&response.body);
        warn!("Backend answered {}", response.status);
        return Err(DashboardError::Upstream {
            status: response.status,
            message: format!("{}: {} - {}", failure_prefix, response.status, text.trim()),
        });
    }

    let body = serde_json::from_slice::<Value>(&response.body)
        .map_err(|e| DashboardError::Decode(e.to_string()))?;
    Ok(Relayed {
        status: response.status,
        body,
    })
}

/// Reject anything that is not named like a CSV file.
pub fn validate_csv_name(file_name: &str) -> Result<()> {
    let lower = file_name.trim().to_ascii_lowercase();
    if lower.len() > ".csv".len() && lower.ends_with(".csv") {
        Ok(())
    } else {
        Err(DashboardError::Validation(
            "Please upload a CSV file".to_string(),
        ))
    }
}

/// Pull the `file` field out of a multipart body. Other fields are ignored.
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DashboardError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DashboardError::Validation(format!("Invalid multipart body: {}", e)))?;

        return Ok(UploadFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(DashboardError::Validation("No file provided".to_string()))
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

// Handlers

/// `POST /api/sync`
pub async fn sync_handler<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Response {
    trigger_sync(&state.transport, &state.config)
        .await
        .into_response()
}

/// `POST /api/upload`
pub async fn upload_handler<T: Transport>(
    State(state): State<Arc<AppState<T>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward_multipart(
        &state.transport,
        &state.config,
        content_type(&headers),
        body,
        UploadTarget::Upload,
    )
    .await
    .into_response()
}

/// `POST /api/recon`
pub async fn recon_handler<T: Transport>(
    State(state): State<Arc<AppState<T>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward_multipart(
        &state.transport,
        &state.config,
        content_type(&headers),
        body,
        UploadTarget::ReconDryRun,
    )
    .await
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        reply: std::result::Result<ForwardResponse, String>,
        seen: Mutex<Vec<ForwardRequest>>,
    }

    impl Canned {
        fn answering(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(ForwardResponse {
                    status,
                    body: Bytes::from(body.to_string()),
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(detail: &str) -> Self {
            Self {
                reply: Err(detail.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<ForwardRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for Canned {
        async fn forward(
            &self,
            request: ForwardRequest,
        ) -> std::result::Result<ForwardResponse, String> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn configured() -> DashboardConfig {
        DashboardConfig {
            backend_base: "http://backend:8000".to_string(),
            admin_token: Some("tok".to_string()),
            ..DashboardConfig::default()
        }
    }

    fn csv(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: Some("text/csv".to_string()),
            bytes: Bytes::from_static(b"date,merchant,amount\n2026-10-01,UBER,12.50\n"),
        }
    }

    #[tokio::test]
    async fn sync_without_token_makes_no_call() {
        let transport = Canned::answering(200, "{}");
        let config = DashboardConfig::default();

        let err = trigger_sync(&transport, &config).await.unwrap_err();
        assert_eq!(err, DashboardError::token_not_configured());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn sync_attaches_token_and_relays_body() {
        let transport = Canned::answering(200, r#"{"ok": true, "expenses_synced": 12}"#);

        let relayed = trigger_sync(&transport, &configured()).await.unwrap();
        assert_eq!(relayed.status, 200);
        assert_eq!(relayed.body["expenses_synced"], 12);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://backend:8000/expenses/admin/sync");
        assert_eq!(calls[0].admin_token.as_deref(), Some("tok"));
        assert_eq!(calls[0].body, ForwardBody::Empty);
    }

    #[tokio::test]
    async fn backend_failure_is_wrapped_with_status() {
        let transport = Canned::answering(503, "service unavailable");

        let err = trigger_sync(&transport, &configured()).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.to_string(), "Sync failed: 503 - service unavailable");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let transport = Canned::failing("connection refused");

        let err = trigger_sync(&transport, &configured()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[tokio::test]
    async fn non_json_success_is_a_decode_error() {
        let transport = Canned::answering(200, "<html>ok</html>");
        let err = trigger_sync(&transport, &configured()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Decode(_)));
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn upload_rejects_non_csv_before_forwarding() {
        let transport = Canned::answering(200, "{}");
        let err = forward_upload(&transport, &configured(), csv("report.xlsx"), UploadTarget::Upload)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn plain_upload_omits_token_unless_configured_to_send_it() {
        let transport = Canned::answering(200, r#"{"total_rows": 1}"#);
        forward_upload(&transport, &configured(), csv("q3.csv"), UploadTarget::Upload)
            .await
            .unwrap();
        let calls = transport.calls();
        assert_eq!(calls[0].url, "http://backend:8000/recon/upload");
        assert_eq!(calls[0].admin_token, None);
        assert_eq!(calls[0].body, ForwardBody::File(csv("q3.csv")));

        let transport = Canned::answering(200, r#"{"total_rows": 1}"#);
        let config = DashboardConfig {
            upload_requires_token: true,
            ..configured()
        };
        forward_upload(&transport, &config, csv("q3.csv"), UploadTarget::Upload)
            .await
            .unwrap();
        assert_eq!(transport.calls()[0].admin_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn recon_dry_run_needs_token() {
        let transport = Canned::answering(200, "{}");
        let config = DashboardConfig {
            admin_token: None,
            ..configured()
        };
        let err = forward_upload(&transport, &config, csv("a.csv"), UploadTarget::ReconDryRun)
            .await
            .unwrap_err();
        assert_eq!(err, DashboardError::token_not_configured());
        assert!(transport.calls().is_empty());

        forward_upload(&transport, &configured(), csv("a.csv"), UploadTarget::ReconDryRun)
            .await
            .unwrap();
        assert_eq!(
            transport.calls()[0].url,
            "http://backend:8000/recon/upload?dry_run=true"
        );
    }

    #[tokio::test]
    async fn multipart_body_is_passed_through_untouched() {
        let transport = Canned::answering(200, r#"{"total_rows": 1}"#);
        let content_type = "multipart/form-data; boundary=XYZ";
        let body = Bytes::from_static(
            b"--XYZ\r\nContent-Disposition: form-data; name=\"source\"\r\n\r\nkirkland\r\n\
--XYZ\r\nContent-Disposition: form-data; name=\"file\"; filename=\"report.txt\"\r\n\r\na,b\r\n--XYZ--\r\n",
        );

        forward_multipart(
            &transport,
            &configured(),
            Some(content_type),
            body.clone(),
            UploadTarget::Upload,
        )
        .await
        .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "http://backend:8000/recon/upload");
        assert_eq!(
            calls[0].body,
            ForwardBody::Raw {
                content_type: content_type.to_string(),
                bytes: body,
            }
        );
    }

    #[tokio::test]
    async fn non_multipart_body_is_not_forwarded() {
        let transport = Canned::answering(200, "{}");

        let err = forward_multipart(
            &transport,
            &configured(),
            Some("application/json"),
            Bytes::from_static(b"{}"),
            UploadTarget::Upload,
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let err = forward_multipart(
            &transport,
            &configured(),
            Some("multipart/form-data; boundary=XYZ"),
            Bytes::new(),
            UploadTarget::ReconDryRun,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "No file provided");
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn csv_name_check() {
        assert!(validate_csv_name("expenses.csv").is_ok());
        assert!(validate_csv_name("EXPENSES.CSV").is_ok());
        assert!(validate_csv_name(".csv").is_err());
        assert!(validate_csv_name("expenses.csv.exe").is_err());
        assert!(validate_csv_name("").is_err());
    }
}
