/*!
# Expense Dashboard

A browser-facing dashboard over an external expense-tracking backend, built in Rust.

## Overview

The dashboard shows headline spend figures, a recent-expenses table and three charts
(spend by category, top merchants, six-month trend). It lets an operator trigger a
backend sync and upload a company T&E report CSV for reconciliation. The backend owns
all data; this crate only reads snapshots and forwards privileged requests.

## Architecture

### Frontend Layer
- **Technologies**: server-rendered HTML (handlebars), inline SVG charts (plotters)
- **Key Components**:
  - KPI cards - Total spend, outstanding amount, recent-expense count
  - Expenses table - Capped to the fetched batch, with status badges
  - Charts - Pie (category), bar (merchant), line (trend), each with an empty state
  - Forms - Sync button and CSV upload, answered with an inline message

### Backend Layer
- **Technologies**: Rust, axum, tokio, reqwest
- **Core Components**:
  - Reporting client - Unauthenticated reads against the reporting API
  - Aggregation transform - Category, merchant and monthly series from raw expenses
  - Proxy endpoints - Attach the admin token server-side and relay the backend's answer
  - Error handler - One error enum mapped to a `{"error": ...}` envelope

## Modules

- **model**: Expense records, derived aggregates and reporting API payloads
- **chart_data**: Pure aggregation of expenses into chart series
- **config**: Environment-derived configuration, read once at start
- **error**: Error taxonomy shared by every component
- **client**: Reporting API reads (web feature)
- **proxy**: Same-origin sync/upload forwarding (web feature)
- **charts**: SVG chart rendering (web feature)
- **views**: Page view models and template rendering (web feature)
- **app**: Routing and server start-up (web feature)

## HTTP Endpoints

- `GET /` - Dashboard page
- `GET /api/dashboard` - The page's data as JSON
- `POST /api/sync` - Trigger a backend sync
- `POST /api/upload` - Forward a reconciliation CSV
- `POST /api/recon` - Forward a reconciliation CSV as an authenticated dry run
- `POST /sync`, `POST /upload` - Form variants that re-render the page with the outcome
*/

pub mod chart_data;
pub mod config;
pub mod error;
pub mod model;

#[cfg(feature = "web")]
pub mod app;
pub mod charts;
pub mod client;
pub mod proxy;
pub mod views;

/// Re-export the commonly used items
pub use chart_data::*;
pub use config::*;
pub use error::DashboardError;
pub use model::*;
