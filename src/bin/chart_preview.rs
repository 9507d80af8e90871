#![cfg(not(tarpaulin_include))]

use std::path::PathBuf;

// Writes the demo charts to disk so the chart styling can be checked without a backend.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("chart_output"));

    let today = chrono::Local::now().date_naive();
    let charts = expense_dashboard::charts::create_example_charts(&output_dir, today)?;

    for (name, file_path) in charts {
        println!("Created {} chart at {}", name, file_path);
    }

    Ok(())
}
