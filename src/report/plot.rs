//! PNG charts for the report, drawn with the plotters bitmap backend.
//!
//! Text needs a TrueType font. One is looked up once per process from
//! [`FONT_CANDIDATES`]; without one the charts are drawn without captions,
//! axis labels or annotations.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, NaiveDateTime};
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;

use crate::color::DivergingMap;
use crate::config::FONT_CANDIDATES;
use crate::data::stats::{BoxStats, CorrelationMatrix, Histogram, Kde};

const FONT: &str = "sans-serif";
const WIDE: (u32, u32) = (1000, 600);
const SQUARE: (u32, u32) = (800, 600);
const BAR_FILL: RGBColor = RGBColor(102, 153, 204);
const LINE: RGBColor = RGBColor(31, 119, 180);

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

/// Register the first readable font under the generic family name.
fn fonts_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        for path in FONT_CANDIDATES {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if plotters::style::register_font(FONT, FontStyle::Normal, bytes).is_ok() {
                debug!("Plot font: {path}");
                return true;
            }
        }
        warn!("No usable font found; plots will be drawn without text");
        false
    })
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Line plot of `values` against `timestamps` (which must be sorted).
pub fn time_series(
    path: &Path,
    title: &str,
    y_label: &str,
    timestamps: &[NaiveDateTime],
    values: &[f64],
) -> Result<()> {
    let points: Vec<(f64, f64)> = timestamps
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(t, &v)| (t.and_utc().timestamp() as f64, v))
        .collect();
    let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.0));
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1));
    let text = fonts_available();

    let root = BitMapBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder
            .caption(title, (FONT, 26))
            .x_label_area_size(45)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    if text {
        chart
            .configure_mesh()
            .x_desc("Date")
            .y_desc(y_label)
            .x_labels(8)
            .x_label_formatter(&|ts| format_timestamp(*ts))
            .draw()?;
    }

    chart.draw_series(LineSeries::new(points, LINE.stroke_width(2)))?;
    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Horizontal box-and-whisker plot. Without any finite value only the axes
/// are drawn.
pub fn boxplot(path: &Path, title: &str, x_label: &str, values: &[f64]) -> Result<()> {
    let stats = BoxStats::compute(values);
    if stats.is_none() {
        warn!("No {x_label} values to plot; {} will be empty", path.display());
    }
    let (x_lo, x_hi) = padded_range(values.iter().copied());
    let text = fonts_available();

    let root = BitMapBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder.caption(title, (FONT, 26)).x_label_area_size(45);
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, 0f64..1f64)?;

    if text {
        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(0)
            .x_desc(x_label)
            .draw()?;
    }

    if let Some(stats) = stats {
        let (box_lo, box_hi, mid) = (0.3, 0.7, 0.5);
        let edge = BLACK.stroke_width(2);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(stats.q1, box_lo), (stats.q3, box_hi)],
            BAR_FILL.filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(stats.q1, box_lo), (stats.q3, box_hi)],
            edge,
        )))?;
        let segments = [
            [(stats.median, box_lo), (stats.median, box_hi)],
            [(stats.whisker_low, mid), (stats.q1, mid)],
            [(stats.q3, mid), (stats.whisker_high, mid)],
            [(stats.whisker_low, 0.4), (stats.whisker_low, 0.6)],
            [(stats.whisker_high, 0.4), (stats.whisker_high, 0.6)],
        ];
        chart.draw_series(
            segments
                .iter()
                .map(|seg| PathElement::new(seg.to_vec(), edge)),
        )?;
        chart.draw_series(
            stats
                .outliers
                .iter()
                .map(|&x| Circle::new((x, mid), 4, BLACK.stroke_width(1))),
        )?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Count histogram with a kernel density curve scaled to the counts. Without
/// any finite value only the axes are drawn.
pub fn histogram_with_kde(path: &Path, title: &str, x_label: &str, values: &[f64]) -> Result<()> {
    let hist = Histogram::auto(values);
    let (x_lo, x_hi, scale) = match &hist {
        Some(h) => (
            h.edges[0],
            h.edges[h.edges.len() - 1],
            h.total() as f64 * h.bin_width(),
        ),
        None => {
            warn!("No {x_label} values to plot; {} will be empty", path.display());
            (0.0, 1.0, 0.0)
        }
    };
    let curve: Vec<(f64, f64)> = Kde::fit(values)
        .map(|k| {
            k.curve(x_lo, x_hi, 200)
                .into_iter()
                .map(|(x, d)| (x, d * scale))
                .collect()
        })
        .unwrap_or_default();

    let y_max = hist
        .iter()
        .flat_map(|h| h.counts.iter())
        .map(|&c| c as f64)
        .chain(curve.iter().map(|p| p.1))
        .fold(1.0, f64::max)
        * 1.05;
    let text = fonts_available();

    let root = BitMapBackend::new(path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder
            .caption(title, (FONT, 26))
            .x_label_area_size(45)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, 0f64..y_max)?;

    if text {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(x_label)
            .y_desc("Count")
            .draw()?;
    }

    if let Some(hist) = &hist {
        let bars = hist.edges.windows(2).zip(&hist.counts);
        chart.draw_series(bars.clone().map(|(e, &c)| {
            Rectangle::new([(e[0], 0.0), (e[1], c as f64)], BAR_FILL.mix(0.7).filled())
        }))?;
        chart.draw_series(bars.map(|(e, &c)| {
            Rectangle::new([(e[0], 0.0), (e[1], c as f64)], WHITE.stroke_width(1))
        }))?;
    }
    if !curve.is_empty() {
        chart.draw_series(LineSeries::new(curve, LINE.stroke_width(2)))?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Annotated correlation heatmap with a colour bar over [-1, 1].
pub fn correlation_heatmap(path: &Path, title: &str, matrix: &CorrelationMatrix) -> Result<()> {
    ensure!(!matrix.is_empty(), "{}: no columns to correlate", path.display());
    let n = matrix.len() as f64;
    let map = DivergingMap::coolwarm(-1.0, 1.0);
    let text = fonts_available();

    // Cells occupy [0, n] x [0, n]; row labels live left of 0, the colour
    // bar right of n.
    let (x_lo, x_hi) = (-1.6, n + 0.9);
    let (y_lo, y_hi) = (-0.6, n);

    let root = BitMapBackend::new(path, SQUARE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if text {
        builder.caption(title, (FONT, 26));
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    let size = matrix.len();
    let cells = (0..size).flat_map(|row| (0..size).map(move |col| (row, col)));
    chart.draw_series(cells.clone().map(|(row, col)| {
        // Row 0 at the top.
        let y = n - 1.0 - row as f64;
        let x = col as f64;
        Rectangle::new(
            [(x, y), (x + 1.0, y + 1.0)],
            map.color_for(matrix.get(row, col)).filled(),
        )
    }))?;

    let steps = 50;
    chart.draw_series((0..steps).map(|i| {
        let y = n * i as f64 / steps as f64;
        let value = -1.0 + 2.0 * i as f64 / steps as f64;
        Rectangle::new(
            [(n + 0.3, y), (n + 0.5, y + n / steps as f64)],
            map.color_for(value).filled(),
        )
    }))?;

    if text {
        let centered = Pos::new(HPos::Center, VPos::Center);
        chart.draw_series(cells.map(|(row, col)| {
            let value = matrix.get(row, col);
            let style = (FONT, 18)
                .into_font()
                .color(&map.text_color_for(value))
                .pos(centered);
            Text::new(
                format!("{value:.2}"),
                (col as f64 + 0.5, n - 0.5 - row as f64),
                style,
            )
        }))?;

        let label_style = (FONT, 14).into_font().color(&BLACK);
        chart.draw_series(matrix.labels.iter().enumerate().map(|(i, label)| {
            Text::new(
                label.clone(),
                (-0.05, n - 0.5 - i as f64),
                label_style.pos(Pos::new(HPos::Right, VPos::Center)),
            )
        }))?;
        chart.draw_series(matrix.labels.iter().enumerate().map(|(i, label)| {
            Text::new(
                label.clone(),
                (i as f64 + 0.5, -0.1),
                label_style.pos(Pos::new(HPos::Center, VPos::Top)),
            )
        }))?;
        chart.draw_series([-1.0, 0.0, 1.0].into_iter().map(|tick: f64| {
            Text::new(
                format!("{tick:.1}"),
                (n + 0.55, n * (tick + 1.0) / 2.0),
                label_style.pos(Pos::new(HPos::Left, VPos::Center)),
            )
        }))?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Data range with 5% padding; a unit range around single values.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi == lo {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn format_timestamp(ts: f64) -> String {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
