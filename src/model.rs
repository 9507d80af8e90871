use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A single expense as returned by the reporting API.
///
/// The backend owns these records; the dashboard only ever reads snapshots.
/// Field aliases cover both the list endpoint (`date`, `status`) and the
/// raw export shape (`txn_date`, `reimbursement_status`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExpenseRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default)]
    pub merchant: Option<String>,

    /// Missing or null amounts contribute zero to every aggregate.
    #[serde(default)]
    pub amount: Option<f64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default, alias = "date")]
    pub txn_date: Option<String>,

    #[serde(default, alias = "status")]
    pub reimbursement_status: Option<String>,

    #[serde(default)]
    pub category_name: Option<String>,

    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub category_id: Option<String>,

    #[serde(default, alias = "external_ref")]
    pub report_ref: Option<String>,

    #[serde(default)]
    pub company_report_status: Option<String>,
}

impl ExpenseRecord {
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    /// Calendar date of the transaction, `None` when missing or unparseable.
    pub fn date(&self) -> Option<NaiveDate> {
        self.txn_date.as_deref().and_then(parse_txn_date)
    }
}

/// Parse the date formats the backend is known to emit.
pub fn parse_txn_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    None
}

/// Closed set of reimbursement states the table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReimbursementStatus {
    Reimbursed,
    Submitted,
    Pending,
}

impl ReimbursementStatus {
    /// Anything unrecognised, including a missing status, is `Pending`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("reimbursed") => ReimbursementStatus::Reimbursed,
            Some("submitted for reimbursement") | Some("submitted") => {
                ReimbursementStatus::Submitted
            }
            _ => ReimbursementStatus::Pending,
        }
    }

    /// CSS class used by the dashboard template.
    pub fn css_class(self) -> &'static str {
        match self {
            ReimbursementStatus::Reimbursed => "reimbursed",
            ReimbursementStatus::Submitted => "submitted",
            ReimbursementStatus::Pending => "pending",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReimbursementStatus::Reimbursed => "Reimbursed",
            ReimbursementStatus::Submitted => "Submitted for Reimbursement",
            ReimbursementStatus::Pending => "Pending",
        }
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub name: String,
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantAggregate {
    pub merchant: String,
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    /// Display label, e.g. `Oct 26`.
    pub period: String,
    #[serde(skip)]
    pub year: i32,
    #[serde(skip)]
    pub month: u32,
    pub amount: f64,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Reporting API payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrencyTotal {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub n: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub by_currency: Vec<CurrencyTotal>,
}

impl Summary {
    /// Headline total: the explicit figure when present, else the per-currency sum.
    pub fn total(&self) -> f64 {
        self.total_amount.unwrap_or_else(|| {
            self.by_currency
                .iter()
                .map(|c| c.total_amount.unwrap_or(0.0))
                .sum()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutstandingRow {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub category_id: Option<String>,
    #[serde(default)]
    pub total_outstanding: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outstanding {
    #[serde(default)]
    pub total_outstanding: Option<f64>,
    #[serde(default)]
    pub outstanding: Vec<OutstandingRow>,
}

impl Outstanding {
    pub fn total(&self) -> f64 {
        self.total_outstanding.unwrap_or_else(|| {
            self.outstanding
                .iter()
                .map(|r| r.total_outstanding.unwrap_or(0.0))
                .sum()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeingBucket {
    pub bucket: String,
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ageing {
    #[serde(default)]
    pub ageing: Vec<AgeingBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Reconciliation upload result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyEntry {
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconMatch {
    pub company_entry: CompanyEntry,
    #[serde(default)]
    pub zoho_matches: Vec<serde_json::Value>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub successful_rows: u64,
    #[serde(default)]
    pub error_rows: u64,
    #[serde(default)]
    pub matches: Option<Vec<ReconMatch>>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Lenient id decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_list_endpoint_shape() {
        let raw = r#"{
            "id": 42,
            "date": "2026-09-14",
            "merchant": "UBER",
            "amount": 23.5,
            "currency": "USD",
            "status": "Reimbursed",
            "company_report_status": "Pending"
        }"#;
        let record: ExpenseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.merchant.as_deref(), Some("UBER"));
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2026, 9, 14));
        assert_eq!(record.reimbursement_status.as_deref(), Some("Reimbursed"));
    }

    #[test]
    fn null_amount_counts_as_zero() {
        let raw = r#"{"id": "a", "amount": null, "category_id": 7}"#;
        let record: ExpenseRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.amount(), 0.0);
        assert_eq!(record.category_id.as_deref(), Some("7"));
    }

    #[test]
    fn parses_timestamps_and_rejects_garbage() {
        assert_eq!(
            parse_txn_date("2026-03-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
        assert_eq!(
            parse_txn_date("2026-03-01T10:00:00"),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
        assert_eq!(parse_txn_date("last tuesday"), None);
        assert_eq!(parse_txn_date(""), None);
    }

    #[test]
    fn status_lookup_is_closed() {
        assert_eq!(
            ReimbursementStatus::from_label(Some("REIMBURSED")),
            ReimbursementStatus::Reimbursed
        );
        assert_eq!(
            ReimbursementStatus::from_label(Some("Submitted for Reimbursement")).css_class(),
            "submitted"
        );
        assert_eq!(
            ReimbursementStatus::from_label(Some("Not Reimbursed")),
            ReimbursementStatus::Pending
        );
        assert_eq!(
            ReimbursementStatus::from_label(None),
            ReimbursementStatus::Pending
        );
    }

    #[test]
    fn summary_total_falls_back_to_currency_rows() {
        let summary: Summary = serde_json::from_str(
            r#"{"by_currency": [{"currency": "USD", "total_amount": 100.0, "n": 3},
                                {"currency": "EUR", "total_amount": 25.5, "n": 1}]}"#,
        )
        .unwrap();
        assert_eq!(summary.total(), 125.5);

        let summary: Summary = serde_json::from_str(r#"{"total_amount": 10.0}"#).unwrap();
        assert_eq!(summary.total(), 10.0);
    }

    #[test]
    fn upload_result_tolerates_missing_optionals() {
        let result: UploadResult =
            serde_json::from_str(r#"{"total_rows": 3, "successful_rows": 2, "error_rows": 1}"#)
                .unwrap();
        assert_eq!(result.total_rows, 3);
        assert!(result.matches.is_none());
        assert!(result.errors.is_none());
    }
}
