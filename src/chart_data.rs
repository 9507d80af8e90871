//! Chart-ready series derived from a flat list of expenses.
//!
//! Every function here is pure: the same input slice always yields the same
//! output, and nothing is carried between calls. These views are the fallback
//! used when the reporting API does not serve its own analytics.

use std::collections::HashMap;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::model::{
    CategoryAggregate, CategoryTotal, ExpenseRecord, MerchantAggregate, MerchantTotal,
    TrendBucket, TrendPoint, parse_txn_date,
};

/// Number of categories kept for display.
pub const TOP_CATEGORIES: usize = 8;
/// Number of merchants kept for display.
pub const TOP_MERCHANTS: usize = 10;
/// Length of the trend window in months, current month included.
pub const TREND_MONTHS: usize = 6;

pub const OTHER_CATEGORY: &str = "Other";
pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// Category key: name, then identifier, then `Other`.
pub fn category_key(expense: &ExpenseRecord) -> &str {
    non_empty(expense.category_name.as_deref())
        .or_else(|| non_empty(expense.category_id.as_deref()))
        .unwrap_or(OTHER_CATEGORY)
}

/// Merchant key, `Unknown` when absent.
pub fn merchant_key(expense: &ExpenseRecord) -> &str {
    non_empty(expense.merchant.as_deref()).unwrap_or(UNKNOWN_MERCHANT)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Sum and count per key, in first-seen order.
fn group_totals<'a, F>(expenses: &'a [ExpenseRecord], key: F) -> Vec<(String, f64, usize)>
where
    F: Fn(&'a ExpenseRecord) -> &'a str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, f64, usize)> = Vec::new();

    for expense in expenses {
        let k = key(expense);
        let slot = *index.entry(k).or_insert_with(|| {
            groups.push((k.to_string(), 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += expense.amount();
        groups[slot].2 += 1;
    }

    // Stable sort: equal sums keep first-occurrence order.
    groups.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    groups
}

/// Every category group, sorted by descending total, untruncated.
pub fn group_by_category(expenses: &[ExpenseRecord]) -> Vec<CategoryAggregate> {
    group_totals(expenses, category_key)
        .into_iter()
        .map(|(name, value, count)| CategoryAggregate { name, value, count })
        .collect()
}

/// Every merchant group, sorted by descending total, untruncated.
pub fn group_by_merchant(expenses: &[ExpenseRecord]) -> Vec<MerchantAggregate> {
    group_totals(expenses, merchant_key)
        .into_iter()
        .map(|(merchant, amount, count)| MerchantAggregate {
            merchant,
            amount,
            count,
        })
        .collect()
}

/// Groups expenses by category and keeps the biggest spenders
///
/// Records with neither a category name nor an identifier are pooled under
/// [`OTHER_CATEGORY`].
///
/// # Arguments
/// * `expenses` - The fetched batch, in backend order
///
/// # Returns
/// * At most [`TOP_CATEGORIES`] aggregates, largest total first; equal totals
///   keep the order in which their category first appeared
pub fn category_data(expenses: &[ExpenseRecord]) -> Vec<CategoryAggregate> {
    let mut groups = group_by_category(expenses);
    groups.truncate(TOP_CATEGORIES);
    groups
}

/// Groups expenses by merchant and keeps the biggest payees
///
/// # Arguments
/// * `expenses` - The fetched batch, in backend order
///
/// # Returns
/// * At most [`TOP_MERCHANTS`] aggregates, largest amount first
pub fn merchant_data(expenses: &[ExpenseRecord]) -> Vec<MerchantAggregate> {
    let mut groups = group_by_merchant(expenses);
    groups.truncate(TOP_MERCHANTS);
    groups
}

/// Monthly spend over the trailing window ending at today's month.
pub fn trend_data(expenses: &[ExpenseRecord]) -> Vec<TrendBucket> {
    trend_data_at(expenses, Local::now().date_naive())
}

/// Monthly spend over the trailing window ending at the month of `today`.
///
/// Records outside the window or without a usable date are skipped here only.
///
/// # Arguments
/// * `expenses` - The fetched batch
/// * `today` - Anchors the window; its month is the last bucket
///
/// # Returns
/// * Exactly [`TREND_MONTHS`] buckets in chronological order, zero-filled
pub fn trend_data_at(expenses: &[ExpenseRecord], today: NaiveDate) -> Vec<TrendBucket> {
    let mut buckets = empty_trend(today);

    for expense in expenses {
        let Some(date) = expense.date() else {
            continue;
        };
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.year == date.year() && b.month == date.month())
        {
            bucket.amount += expense.amount();
            bucket.count += 1;
        }
    }

    buckets
}

/// The zero-valued window, oldest month first.
pub fn empty_trend(today: NaiveDate) -> Vec<TrendBucket> {
    let anchor = today.year() * 12 + today.month0() as i32;

    (0..TREND_MONTHS as i32)
        .rev()
        .map(|back| {
            let ordinal = anchor - back;
            let year = ordinal.div_euclid(12);
            let month = ordinal.rem_euclid(12) as u32 + 1;
            TrendBucket {
                period: month_label(year, month),
                year,
                month,
                amount: 0.0,
                count: 0,
            }
        })
        .collect()
}

/// Short label such as `Oct 26`.
pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %y").to_string())
        .unwrap_or_else(|| format!("{:02}/{:02}", month, year.rem_euclid(100)))
}

// ---------------------------------------------------------------------------
// Backend analytics vs. local aggregation
// ---------------------------------------------------------------------------

/// Where a resolved series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSource {
    Backend,
    Computed,
}

/// The three chart series, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub by_category: Vec<CategoryAggregate>,
    pub category_source: SeriesSource,
    pub by_merchant: Vec<MerchantAggregate>,
    pub merchant_source: SeriesSource,
    pub trend: Vec<TrendBucket>,
    pub trend_source: SeriesSource,
}

/// Picks backend analytics when the API served them, else aggregates locally
///
/// Each view resolves on its own: a missing merchant report does not discard
/// a category report that did arrive. Backend rows carry no counts, so those
/// aggregates report a count of zero.
///
/// # Arguments
/// * `expenses` - The fetched batch, used for every view the backend did not serve
/// * `backend_categories` - `/reports/by_category`, if that read succeeded
/// * `backend_merchants` - `/reports/by_merchant`, if that read succeeded
/// * `backend_trend` - `/reports/trends`, if that read succeeded
/// * `today` - Anchors the computed trend window
///
/// # Returns
/// * The three series, each tagged with the [`SeriesSource`] it came from.
///   Backend trend points keep their raw date as the label; a date that does
///   not parse leaves `year` and `month` at zero.
pub fn resolve_analytics(
    expenses: &[ExpenseRecord],
    backend_categories: Option<Vec<CategoryTotal>>,
    backend_merchants: Option<Vec<MerchantTotal>>,
    backend_trend: Option<Vec<TrendPoint>>,
    today: NaiveDate,
) -> Analytics {
    let (by_category, category_source) = match backend_categories {
        Some(rows) => (
            rows.into_iter()
                .map(|r| CategoryAggregate {
                    name: r.category,
                    value: r.total,
                    count: 0,
                })
                .collect(),
            SeriesSource::Backend,
        ),
        None => (category_data(expenses), SeriesSource::Computed),
    };

    let (by_merchant, merchant_source) = match backend_merchants {
        Some(rows) => (
            rows.into_iter()
                .map(|r| MerchantAggregate {
                    merchant: r.merchant,
                    amount: r.total,
                    count: 0,
                })
                .collect(),
            SeriesSource::Backend,
        ),
        None => (merchant_data(expenses), SeriesSource::Computed),
    };

    let (trend, trend_source) = match backend_trend {
        Some(points) => (
            points
                .into_iter()
                .map(|p| {
                    let date = parse_txn_date(&p.date);
                    TrendBucket {
                        year: date.map(|d| d.year()).unwrap_or_default(),
                        month: date.map(|d| d.month()).unwrap_or_default(),
                        period: p.date,
                        amount: p.total,
                        count: 0,
                    }
                })
                .collect(),
            SeriesSource::Backend,
        ),
        None => (trend_data_at(expenses, today), SeriesSource::Computed),
    };

    Analytics {
        by_category,
        category_source,
        by_merchant,
        merchant_source,
        trend,
        trend_source,
    }
}

// ---------------------------------------------------------------------------
// Demo series
// ---------------------------------------------------------------------------

pub fn mock_category_data() -> Vec<CategoryAggregate> {
    [
        ("Travel", 12450.0, 28),
        ("Meals", 8200.0, 45),
        ("Software", 5600.0, 12),
        ("Office Supplies", 3400.0, 18),
        ("Transportation", 2100.0, 22),
        ("Entertainment", 1800.0, 15),
    ]
    .into_iter()
    .map(|(name, value, count)| CategoryAggregate {
        name: name.to_string(),
        value,
        count,
    })
    .collect()
}

pub fn mock_merchant_data() -> Vec<MerchantAggregate> {
    [
        ("UBER", 3200.0, 18),
        ("STARBUCKS", 2800.0, 24),
        ("AMAZON", 2400.0, 8),
        ("DELTA AIR LINES", 2200.0, 4),
        ("MARRIOTT", 1900.0, 6),
        ("ZOOM", 1200.0, 3),
        ("LYFT", 980.0, 12),
        ("SLACK", 840.0, 2),
    ]
    .into_iter()
    .map(|(merchant, amount, count)| MerchantAggregate {
        merchant: merchant.to_string(),
        amount,
        count,
    })
    .collect()
}

/// Six months of demo spend ending at the month of `today`.
pub fn mock_trend_data(today: NaiveDate) -> Vec<TrendBucket> {
    let samples = [
        (8200.0, 32),
        (9800.0, 38),
        (7600.0, 28),
        (11200.0, 45),
        (6800.0, 24),
        (9400.0, 36),
    ];
    empty_trend(today)
        .into_iter()
        .zip(samples)
        .map(|(bucket, (amount, count))| TrendBucket {
            amount,
            count,
            ..bucket
        })
        .collect()
}
