use thiserror::Error;

/// Every failure the dashboard can surface to a caller.
///
/// All of these end up as a `{"error": "..."}` envelope when they cross the
/// HTTP boundary (see the `IntoResponse` impl in the `web` build).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// Required credential or base URL missing at the proxy layer.
    #[error("{0}")]
    Configuration(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The outbound call itself failed (DNS, connect, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// Rejected before any network call was made.
    #[error("{0}")]
    Validation(String),

    /// A read against the reporting API returned a non-success status.
    #[error("GET {path} failed: {status}")]
    RemoteRead { path: String, status: u16 },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Message used whenever the admin token is absent.
pub const TOKEN_NOT_CONFIGURED: &str = "Admin token not configured";

impl DashboardError {
    pub fn token_not_configured() -> Self {
        DashboardError::Configuration(TOKEN_NOT_CONFIGURED.to_string())
    }

    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            DashboardError::Configuration(_) => 500,
            DashboardError::Upstream { status, .. } => *status,
            DashboardError::Transport(_) => 500,
            DashboardError::Validation(_) => 400,
            DashboardError::RemoteRead { status, .. } => *status,
            DashboardError::Decode(_) => 502,
        }
    }
}

#[cfg(feature = "web")]
impl axum::response::IntoResponse for DashboardError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = StatusCode::from_u16(self.status_code())
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY);

        (
            status,
            axum::Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_is_a_server_error() {
        let err = DashboardError::token_not_configured();
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "Admin token not configured");
    }

    #[test]
    fn upstream_error_keeps_backend_status() {
        let err = DashboardError::Upstream {
            status: 503,
            message: "Sync failed: 503 - service unavailable".to_string(),
        };
        assert_eq!(err.status_code(), 503);
        assert!(err.to_string().contains("service unavailable"));
    }

    #[test]
    fn transport_error_is_prefixed() {
        let err = DashboardError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn remote_read_error_names_path_and_status() {
        let err = DashboardError::RemoteRead {
            path: "/reports/summary".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "GET /reports/summary failed: 404");
    }
}
