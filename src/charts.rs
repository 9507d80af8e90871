#![cfg(feature = "web")]
use plotters::prelude::*;
use std::path::Path;

use crate::chart_data::{mock_category_data, mock_merchant_data, mock_trend_data};
use crate::model::{CategoryAggregate, MerchantAggregate, TrendBucket};

/// Text shown in place of a chart with nothing to draw.
pub const EMPTY_STATE: &str = "No data available";

/// Slice colours, cycled when there are more points than entries.
const PALETTE: [RGBColor; 8] = [
    RGBColor(0x5c, 0xc8, 0xff),
    RGBColor(0x00, 0xd4, 0xaa),
    RGBColor(0xff, 0xb3, 0x47),
    RGBColor(0xff, 0x6b, 0x6b),
    RGBColor(0xc4, 0x71, 0xed),
    RGBColor(0x32, 0xd7, 0x4b),
    RGBColor(0x00, 0x7a, 0xff),
    RGBColor(0xff, 0x95, 0x00),
];

/// Chart shapes the dashboard draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    /// Share of spend per category
    Pie,

    /// Spend per merchant
    Bar,

    /// Spend per month
    Line,
}

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct ChartOptions {
    /// Title drawn above the chart
    pub title: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    pub kind: ChartKind,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Chart".to_string(),
            width: 480,
            height: 300,
            kind: ChartKind::Bar,
        }
    }
}

impl ChartOptions {
    pub fn new(title: &str, kind: ChartKind) -> Self {
        Self {
            title: title.to_string(),
            kind,
            ..Self::default()
        }
    }
}

/// One labelled value on a chart.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

pub fn category_points(data: &[CategoryAggregate]) -> Vec<ChartPoint> {
    data.iter()
        .map(|c| ChartPoint {
            label: c.name.clone(),
            value: c.value,
        })
        .collect()
}

pub fn merchant_points(data: &[MerchantAggregate]) -> Vec<ChartPoint> {
    data.iter()
        .map(|m| ChartPoint {
            label: m.merchant.clone(),
            value: m.amount,
        })
        .collect()
}

pub fn trend_points(data: &[TrendBucket]) -> Vec<ChartPoint> {
    data.iter()
        .map(|b| ChartPoint {
            label: b.period.clone(),
            value: b.amount,
        })
        .collect()
}

/// True when a chart would carry no information.
pub fn is_empty(points: &[ChartPoint]) -> bool {
    points.iter().all(|p| p.value <= 0.0)
}

/// Renders a chart to an SVG document
///
/// # Arguments
/// * `points` - Labelled values, in display order
/// * `options` - Title, size and chart kind
///
/// # Returns
/// * `Ok(Some(svg))` - The complete `<svg>` document
/// * `Ok(None)` - Nothing to draw (no points, or none above zero); callers show
///   [`EMPTY_STATE`] instead of an empty set of axes
/// * `Err` - The drawing backend failed
///
/// # Examples
/// ```
/// use expense_dashboard::charts::{ChartKind, ChartOptions, ChartPoint, render_chart};
///
/// let points = vec![ChartPoint { label: "Travel".to_string(), value: 150.0 }];
/// let svg = render_chart(&points, &ChartOptions::new("Spend by Category", ChartKind::Pie))
///     .unwrap()
///     .unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn render_chart(
    points: &[ChartPoint],
    options: &ChartOptions,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    if is_empty(points) {
        return Ok(None);
    }

    let mut svg = String::new();
    match options.kind {
        ChartKind::Pie => draw_pie(&mut svg, points, options)?,
        ChartKind::Bar => draw_bar(&mut svg, points, options)?,
        ChartKind::Line => draw_line(&mut svg, points, options)?,
    }
    Ok(Some(svg))
}

fn draw_pie(
    svg: &mut String,
    points: &[ChartPoint],
    options: &ChartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(&options.title, ("sans-serif", 20))?;

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = (w.min(h) as f64 / 2.0 - 30.0).max(10.0);

    // Slices with no spend would only clutter the labels.
    let shown: Vec<&ChartPoint> = points.iter().filter(|p| p.value > 0.0).collect();
    let sizes: Vec<f64> = shown.iter().map(|p| p.value).collect();
    let labels: Vec<String> = shown.iter().map(|p| p.label.clone()).collect();
    let colors: Vec<RGBColor> = (0..shown.len())
        .map(|i| PALETTE[i % PALETTE.len()])
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.donut_hole(radius * 0.5);
    pie.label_style(("sans-serif", 12).into_font().color(&BLACK));
    area.draw(&pie)?;

    root.present()?;
    Ok(())
}

fn draw_bar(
    svg: &mut String,
    points: &[ChartPoint],
    options: &ChartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_y = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..points.len() as i32).into_segmented(),
            0.0..max_y * 1.1,
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(points.len())
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels
                .get(*i as usize)
                .map(|l| l.to_string())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(PALETTE[0].filled())
            .margin(8)
            .data(points.iter().enumerate().map(|(i, p)| (i as i32, p.value))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_line(
    svg: &mut String,
    points: &[ChartPoint],
    options: &ChartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_y = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let max_x = (points.len() as f64 - 1.0).max(1.0);
    let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.25..max_x + 0.25, 0.0..max_y * 1.1)?;

    chart
        .configure_mesh()
        .x_labels(points.len())
        .x_label_formatter(&|x| {
            let rounded = x.round();
            if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
                return String::new();
            }
            labels
                .get(rounded as usize)
                .map(|l| l.to_string())
                .unwrap_or_default()
        })
        .draw()?;

    let series = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value));

    chart.draw_series(LineSeries::new(series.clone(), PALETTE[0].stroke_width(3)))?;
    chart.draw_series(series.map(|xy| Circle::new(xy, 4, PALETTE[0].filled())))?;

    root.present()?;
    Ok(())
}

/// Writes the demo category, merchant and trend charts as SVG files into
/// `output_dir`.
///
/// # Returns
/// * A vector of tuples containing chart name and file path
pub fn create_example_charts(
    output_dir: &Path,
    today: chrono::NaiveDate,
) -> std::io::Result<Vec<(String, String)>> {
    std::fs::create_dir_all(output_dir)?;

    let examples = [
        (
            "category",
            category_points(&mock_category_data()),
            ChartOptions::new("Spend by Category", ChartKind::Pie),
        ),
        (
            "merchant",
            merchant_points(&mock_merchant_data()),
            ChartOptions::new("Top Merchants", ChartKind::Bar),
        ),
        (
            "trend",
            trend_points(&mock_trend_data(today)),
            ChartOptions::new("Spending Trend", ChartKind::Line),
        ),
    ];

    let mut result = Vec::new();
    for (name, points, options) in examples {
        match render_chart(&points, &options) {
            Ok(Some(svg)) => {
                let path = output_dir.join(format!("{}.svg", name));
                std::fs::write(&path, svg)?;
                result.push((name.to_string(), path.display().to_string()));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Could not render {} chart: {}", name, e),
        }
    }

    Ok(result)
}
