use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Local;
use log::{info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::chart_data::resolve_analytics;
use crate::client::ReportingClient;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::model::UploadResult;
use crate::proxy::{self, HttpTransport, Relayed, Transport, UploadTarget};
use crate::views::{DashboardData, Flash, Outcome, Templates};

/// Uploaded reports larger than this are refused by the extractor.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared, read-only state behind every handler.
pub struct AppState<T: Transport = HttpTransport> {
    pub config: DashboardConfig,
    pub client: ReportingClient,
    pub transport: T,
    pub templates: Templates,
}

impl<T: Transport> AppState<T> {
    pub fn new(
        config: DashboardConfig,
        transport: T,
        http: reqwest::Client,
    ) -> std::result::Result<Self, Box<handlebars::TemplateError>> {
        Ok(Self {
            client: ReportingClient::new(http, &config),
            config,
            transport,
            templates: Templates::new()?,
        })
    }
}

/// Build the dashboard router around an already-constructed state.
pub fn router<T: Transport>(state: Arc<AppState<T>>) -> Router {
    Router::new()
        .route("/", get(dashboard_page::<T>))
        .route("/api/dashboard", get(dashboard_json::<T>))
        .route("/api/sync", post(proxy::sync_handler::<T>))
        .route("/api/upload", post(proxy::upload_handler::<T>))
        .route("/api/recon", post(proxy::recon_handler::<T>))
        .route("/sync", post(sync_form::<T>))
        .route("/upload", post(upload_form::<T>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(ServiceBuilder::new().layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        )))
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    if !config.has_admin_token() {
        warn!("ADMIN_TOKEN is not set; sync and reconciliation requests will be refused");
    }
    info!("Reading reports from {}", config.api_base);
    info!("Forwarding privileged requests to {}", config.backend_base);

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(
        config,
        HttpTransport::new(http.clone()),
        http,
    )?);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn loaded<V>(what: &str, result: Result<V>) -> Option<V> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not load {}: {}", what, e);
            None
        }
    }
}

/// Fetch every panel's data concurrently. A failed read only blanks its own panel.
pub async fn gather<T: Transport>(state: &AppState<T>) -> DashboardData {
    let client = &state.client;
    let (summary, expenses, outstanding, ageing, by_category, by_merchant, trends) = tokio::join!(
        client.fetch_summary(),
        client.fetch_expenses(state.config.expense_limit, None),
        client.fetch_outstanding(),
        client.fetch_ageing(),
        client.fetch_by_category(),
        client.fetch_by_merchant(),
        client.fetch_trends(),
    );

    let expenses = loaded("expenses", expenses);
    let by_category = loaded("category analytics", by_category);
    let by_merchant = loaded("merchant analytics", by_merchant);
    let trends = loaded("trend analytics", trends);

    let nothing_to_chart = expenses.is_none()
        && by_category.is_none()
        && by_merchant.is_none()
        && trends.is_none();
    let analytics = if nothing_to_chart {
        None
    } else {
        Some(resolve_analytics(
            expenses.as_deref().unwrap_or(&[]),
            by_category,
            by_merchant,
            trends,
            Local::now().date_naive(),
        ))
    };

    DashboardData {
        summary: loaded("summary", summary),
        outstanding: loaded("outstanding report", outstanding),
        ageing: loaded("ageing report", ageing),
        expenses,
        analytics,
    }
}

fn render_page<T: Transport>(state: &AppState<T>, data: &DashboardData, outcome: &Outcome) -> Response {
    match state.templates.render_dashboard(data, outcome) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("Failed to render dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render dashboard").into_response()
        }
    }
}

async fn dashboard_page<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Response {
    let data = gather(&state).await;
    render_page(&state, &data, &Outcome::default())
}

async fn dashboard_json<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Json<DashboardData> {
    Json(gather(&state).await)
}

/// Inline message for the sync button.
pub fn sync_flash(result: &Result<Relayed>) -> Flash {
    match result {
        Ok(relayed) => {
            let synced = relayed
                .body
                .get("expenses_synced")
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            Flash::success(format!("Sync completed: {} expenses processed", synced))
        }
        // Already carries the "Sync failed" prefix.
        Err(DashboardError::Upstream { message, .. }) => Flash::error(message.clone()),
        Err(e) => Flash::error(format!("Sync failed: {}", e)),
    }
}

/// Inline message and parsed result for the upload form.
pub fn upload_outcome(result: Result<Relayed>) -> (Flash, Option<UploadResult>) {
    match result {
        Ok(relayed) => match serde_json::from_value::<UploadResult>(relayed.body) {
            Ok(parsed) => (
                Flash::success(format!(
                    "Processed {} of {} rows",
                    parsed.successful_rows, parsed.total_rows
                )),
                Some(parsed),
            ),
            Err(e) => {
                warn!("Unexpected upload result shape: {}", e);
                (
                    Flash::error("Upload accepted but the result could not be read"),
                    None,
                )
            }
        },
        Err(e) => (Flash::error(e.to_string()), None),
    }
}

async fn sync_form<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Response {
    let result = proxy::trigger_sync(&state.transport, &state.config).await;
    let outcome = Outcome {
        sync: Some(sync_flash(&result)),
        ..Outcome::default()
    };
    let data = gather(&state).await;
    render_page(&state, &data, &outcome)
}

async fn upload_form<T: Transport>(
    State(state): State<Arc<AppState<T>>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(mut multipart) => match proxy::read_upload(&mut multipart).await {
            Ok(file) => {
                proxy::forward_upload(&state.transport, &state.config, file, UploadTarget::Upload)
                    .await
            }
            Err(e) => Err(e),
        },
        Err(e) => Err(DashboardError::Validation(format!(
            "Invalid multipart body: {}",
            e
        ))),
    };

    let (flash, upload_result) = upload_outcome(result);
    let outcome = Outcome {
        upload: Some(flash),
        upload_result,
        ..Outcome::default()
    };
    let data = gather(&state).await;
    render_page(&state, &data, &outcome)
}
