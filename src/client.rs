#![cfg(feature = "web")]

use log::{debug, warn};
use reqwest::header::{CACHE_CONTROL, HeaderValue};
use serde::de::DeserializeOwned;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::model::{
    Ageing, CategoryTotal, ExpenseRecord, MerchantTotal, Outstanding, Summary, TrendPoint,
};

/// Read-only client for the reporting API.
///
/// Every call is a single unauthenticated GET; nothing is retried. Callers
/// decide how to render a missing value.
#[derive(Clone)]
pub struct ReportingClient {
    http: reqwest::Client,
    base: String,
}

impl ReportingClient {
    pub fn new(http: reqwest::Client, config: &DashboardConfig) -> Self {
        Self {
            http,
            base: config.api_base.clone(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-store"))
            .send()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} failed: {}", path, status.as_u16());
            return Err(DashboardError::RemoteRead {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DashboardError::Decode(format!("{}: {}", path, e)))
    }

    pub async fn fetch_summary(&self) -> Result<Summary> {
        self.get("/reports/summary").await
    }

    /// Most recent expenses, newest first, optionally filtered by status.
    pub async fn fetch_expenses(
        &self,
        limit: u32,
        status: Option<&str>,
    ) -> Result<Vec<ExpenseRecord>> {
        self.get(&expenses_path(limit, status)).await
    }

    pub async fn fetch_outstanding(&self) -> Result<Outstanding> {
        self.get("/reports/outstanding").await
    }

    pub async fn fetch_ageing(&self) -> Result<Ageing> {
        self.get("/reports/ageing").await
    }

    pub async fn fetch_by_category(&self) -> Result<Vec<CategoryTotal>> {
        self.get("/reports/by_category").await
    }

    pub async fn fetch_by_merchant(&self) -> Result<Vec<MerchantTotal>> {
        self.get("/reports/by_merchant").await
    }

    pub async fn fetch_trends(&self) -> Result<Vec<TrendPoint>> {
        self.get("/reports/trends").await
    }
}

fn expenses_path(limit: u32, status: Option<&str>) -> String {
    match status.filter(|s| !s.is_empty()) {
        Some(status) => format!(
            "/expenses?limit={}&status={}",
            limit,
            urlencoding::encode(status)
        ),
        None => format!("/expenses?limit={}", limit),
    }
}
