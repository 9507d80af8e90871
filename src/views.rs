#![cfg(feature = "web")]

use handlebars::Handlebars;
use serde::Serialize;

use crate::chart_data::{Analytics, SeriesSource};
use crate::charts::{
    ChartKind, ChartOptions, ChartPoint, EMPTY_STATE, category_points, merchant_points,
    render_chart, trend_points,
};
use crate::model::{Ageing, ExpenseRecord, Outstanding, ReimbursementStatus, Summary, UploadResult};

/// Upper bound on table rows, whatever batch the caller hands in.
pub const MAX_TABLE_ROWS: usize = 100;

/// Shown in a KPI card whose read failed.
pub const MISSING_VALUE: &str = "—";

const DASHBOARD_TEMPLATE: &str = "dashboard";

/// Everything the page handler fetched. `None` marks a read that failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub summary: Option<Summary>,
    pub outstanding: Option<Outstanding>,
    pub ageing: Option<Ageing>,
    pub expenses: Option<Vec<ExpenseRecord>>,
    pub analytics: Option<Analytics>,
}

/// Inline message shown next to the control that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub kind: &'static str,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

/// Outcome of a form post, rendered back into the page.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub sync: Option<Flash>,
    pub upload: Option<Flash>,
    pub upload_result: Option<UploadResult>,
}

#[derive(Debug, Serialize)]
struct KpiView {
    label: &'static str,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseRow {
    pub date: String,
    pub merchant: String,
    pub amount: String,
    pub currency: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

#[derive(Debug, Serialize)]
struct ChartPanel {
    title: &'static str,
    svg: Option<String>,
    message: Option<&'static str>,
    source: Option<SeriesSource>,
}

#[derive(Debug, Serialize)]
struct AgeingRow {
    bucket: String,
    total: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchView {
    pub merchant: String,
    pub amount: String,
    pub date: String,
    pub confidence_pct: u32,
    pub confidence_class: &'static str,
    pub candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadView {
    pub total_rows: u64,
    pub successful_rows: u64,
    pub error_rows: u64,
    pub matches: Vec<MatchView>,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PageView {
    kpis: Vec<KpiView>,
    charts: Vec<ChartPanel>,
    expenses: Option<Vec<ExpenseRow>>,
    expenses_loaded: bool,
    ageing: Option<Vec<AgeingRow>>,
    sync: Option<Flash>,
    upload: Option<Flash>,
    upload_result: Option<UploadView>,
}

/// Template registry for the dashboard page.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, Box<handlebars::TemplateError>> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(DASHBOARD_TEMPLATE, include_str!("./static/dashboard.hbs"))
            .map_err(Box::new)?;
        Ok(Self { registry })
    }

    /// Render the full page.
    pub fn render_dashboard(
        &self,
        data: &DashboardData,
        outcome: &Outcome,
    ) -> Result<String, handlebars::RenderError> {
        let view = PageView {
            kpis: kpis(data),
            charts: chart_panels(data.analytics.as_ref()),
            expenses: data
                .expenses
                .as_deref()
                .map(|rows| expense_rows(rows, MAX_TABLE_ROWS)),
            expenses_loaded: data.expenses.is_some(),
            ageing: data.ageing.as_ref().map(|a| {
                a.ageing
                    .iter()
                    .map(|b| AgeingRow {
                        bucket: b.bucket.clone(),
                        total: format_money(b.total.unwrap_or(0.0)),
                    })
                    .collect()
            }),
            sync: outcome.sync.clone(),
            upload: outcome.upload.clone(),
            upload_result: outcome.upload_result.as_ref().map(upload_view),
        };
        self.registry.render(DASHBOARD_TEMPLATE, &view)
    }
}

fn kpis(data: &DashboardData) -> Vec<KpiView> {
    let missing = || MISSING_VALUE.to_string();
    vec![
        KpiView {
            label: "Total Expenses",
            value: data
                .summary
                .as_ref()
                .map(|s| format_money(s.total()))
                .unwrap_or_else(missing),
        },
        KpiView {
            label: "Outstanding Amount",
            value: data
                .outstanding
                .as_ref()
                .map(|o| format_money(o.total()))
                .unwrap_or_else(missing),
        },
        KpiView {
            label: "Recent Expenses",
            value: data
                .expenses
                .as_ref()
                .map(|e| e.len().to_string())
                .unwrap_or_else(missing),
        },
    ]
}

fn chart_panels(analytics: Option<&Analytics>) -> Vec<ChartPanel> {
    let Some(analytics) = analytics else {
        return ["Spend by Category", "Top Merchants", "Spending Trend"]
            .into_iter()
            .map(|title| ChartPanel {
                title,
                svg: None,
                message: Some("Data unavailable"),
                source: None,
            })
            .collect();
    };

    vec![
        chart_panel(
            "Spend by Category",
            ChartKind::Pie,
            category_points(&analytics.by_category),
            analytics.category_source,
        ),
        chart_panel(
            "Top Merchants",
            ChartKind::Bar,
            merchant_points(&analytics.by_merchant),
            analytics.merchant_source,
        ),
        chart_panel(
            "Spending Trend",
            ChartKind::Line,
            trend_points(&analytics.trend),
            analytics.trend_source,
        ),
    ]
}

fn chart_panel(
    title: &'static str,
    kind: ChartKind,
    points: Vec<ChartPoint>,
    source: SeriesSource,
) -> ChartPanel {
    let (svg, message) = match render_chart(&points, &ChartOptions::new(title, kind)) {
        Ok(Some(svg)) => (Some(svg), None),
        Ok(None) => (None, Some(EMPTY_STATE)),
        Err(e) => {
            log::warn!("Failed to render {}: {}", title, e);
            (None, Some("Chart unavailable"))
        }
    };
    ChartPanel {
        title,
        svg,
        message,
        source: Some(source),
    }
}

/// Table rows for at most `cap` records (and never more than [`MAX_TABLE_ROWS`]).
pub fn expense_rows(records: &[ExpenseRecord], cap: usize) -> Vec<ExpenseRow> {
    records
        .iter()
        .take(cap.min(MAX_TABLE_ROWS))
        .map(|r| {
            let status = ReimbursementStatus::from_label(r.reimbursement_status.as_deref());
            ExpenseRow {
                date: r.txn_date.clone().unwrap_or_default(),
                merchant: r
                    .merchant
                    .clone()
                    .unwrap_or_else(|| crate::chart_data::UNKNOWN_MERCHANT.to_string()),
                amount: format_amount(r.amount()),
                currency: r.currency.clone().unwrap_or_default(),
                status: status.label(),
                status_class: status.css_class(),
            }
        })
        .collect()
}

/// Badge class for a reconciliation confidence score.
pub fn confidence_class(confidence: f64) -> &'static str {
    if confidence > 0.8 {
        "high"
    } else if confidence > 0.6 {
        "medium"
    } else {
        "low"
    }
}

pub fn upload_view(result: &UploadResult) -> UploadView {
    UploadView {
        total_rows: result.total_rows,
        successful_rows: result.successful_rows,
        error_rows: result.error_rows,
        matches: result
            .matches
            .iter()
            .flatten()
            .map(|m| MatchView {
                merchant: m.company_entry.merchant.clone().unwrap_or_default(),
                amount: format_money(m.company_entry.amount.unwrap_or(0.0)),
                date: m.company_entry.date.clone().unwrap_or_default(),
                confidence_pct: (m.confidence.clamp(0.0, 1.0) * 100.0).round() as u32,
                confidence_class: confidence_class(m.confidence),
                candidates: m.zoho_matches.len(),
            })
            .collect(),
        errors: result.errors.clone().unwrap_or_default(),
    }
}

/// `1234.5` → `1,234.50`.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, grouped, cents % 100)
}

/// `1234.5` → `$1,234.50`.
pub fn format_money(amount: f64) -> String {
    let formatted = format_amount(amount);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-${}", rest),
        None => format!("${}", formatted),
    }
}
