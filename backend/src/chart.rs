//! SVG rendering of query visualizations
//!
//! Produces a standalone SVG document for each chart kind returned by graph
//! mode queries.

use crate::query::{SeriesChart, VisualizationData};
use std::f64::consts::PI;
use std::fmt::Write;

const WIDTH: f64 = 720.0;
const HEIGHT: f64 = 440.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 80.0;
const LABEL_CHARS: usize = 14;

const PALETTE: &[&str] = &[
    "#4f81bd", "#c0504d", "#9bbb59", "#8064a2", "#4bacc6", "#f79646", "#2c4d75", "#772c2a",
    "#5f7530", "#4d3b62",
];

/// Render a visualization as an SVG document
pub fn render_svg(data: &VisualizationData) -> String {
    match data {
        VisualizationData::BarChart(chart) => bar_chart(chart),
        VisualizationData::LineChart(chart) => line_chart(chart),
        VisualizationData::PieChart(chart) => pie_chart(chart),
        VisualizationData::SingleValue {
            value,
            label,
            title,
        } => single_value(*value, label, title),
    }
}

/// Escape text for use in SVG content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn open(title: &str) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        svg,
        r#"<rect width="{}" height="{}" fill="white"/><text x="{}" y="28" text-anchor="middle" font-size="18" font-weight="bold">{}</text>"#,
        WIDTH,
        HEIGHT,
        WIDTH / 2.0,
        escape_xml(title)
    );
    svg
}

fn close(mut svg: String) -> String {
    svg.push_str("</svg>");
    svg
}

fn no_data(title: &str) -> String {
    let mut svg = open(title);
    let _ = write!(
        svg,
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="#999"/><text class="no-data" x="{}" y="{}" text-anchor="middle" font-size="16" fill="#666">No data</text>"##,
        MARGIN_LEFT,
        MARGIN_TOP,
        plot_width(),
        plot_height(),
        WIDTH / 2.0,
        HEIGHT / 2.0
    );
    close(svg)
}

fn plot_width() -> f64 {
    WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

fn plot_height() -> f64 {
    HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

fn short_label(label: &str) -> String {
    if label.chars().count() > LABEL_CHARS {
        let cut: String = label.chars().take(LABEL_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        label.to_string()
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Positive maximum of the series, if any
fn series_max(chart: &SeriesChart) -> Option<f64> {
    let max = chart.values.iter().copied().fold(0.0_f64, f64::max);
    (max > 0.0).then_some(max)
}

/// Axes, gridlines and axis titles shared by bar and line charts
fn axes(svg: &mut String, chart: &SeriesChart, max: f64) {
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + plot_height();
    let _ = write!(
        svg,
        r##"<line x1="{x0}" y1="{top}" x2="{x0}" y2="{y0}" stroke="#333"/><line x1="{x0}" y1="{y0}" x2="{right}" y2="{y0}" stroke="#333"/>"##,
        top = MARGIN_TOP,
        right = x0 + plot_width(),
    );

    for step in 0..=4 {
        let fraction = step as f64 / 4.0;
        let y = y0 - fraction * plot_height();
        let _ = write!(
            svg,
            r##"<line x1="{x0}" y1="{y:.1}" x2="{right}" y2="{y:.1}" stroke="#eee"/><text x="{tx}" y="{ty:.1}" text-anchor="end" font-size="11">{label}</text>"##,
            right = x0 + plot_width(),
            tx = x0 - 6.0,
            ty = y + 4.0,
            label = format_value(max * fraction),
        );
    }

    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="13">{}</text><text x="16" y="{}" text-anchor="middle" font-size="13" transform="rotate(-90 16 {})">{}</text>"#,
        x0 + plot_width() / 2.0,
        HEIGHT - 16.0,
        escape_xml(&chart.category_label),
        MARGIN_TOP + plot_height() / 2.0,
        MARGIN_TOP + plot_height() / 2.0,
        escape_xml(&chart.value_label),
    );
}

fn category_label(svg: &mut String, x: f64, label: &str) {
    let y = MARGIN_TOP + plot_height() + 16.0;
    let _ = write!(
        svg,
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="end" font-size="11" transform="rotate(-30 {x:.1} {y:.1})">{}</text>"#,
        escape_xml(&short_label(label)),
    );
}

fn bar_chart(chart: &SeriesChart) -> String {
    let Some(max) = series_max(chart) else {
        return no_data(&chart.title);
    };
    let mut svg = open(&chart.title);
    axes(&mut svg, chart, max);

    let slot = plot_width() / chart.values.len() as f64;
    let bar_width = slot * 0.7;
    let y0 = MARGIN_TOP + plot_height();

    for (idx, value) in chart.values.iter().enumerate() {
        let height = value.max(0.0) / max * plot_height();
        let x = MARGIN_LEFT + idx as f64 * slot + (slot - bar_width) / 2.0;
        let _ = write!(
            svg,
            r#"<rect class="bar" x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{height:.1}" fill="{fill}"><title>{tip}</title></rect>"#,
            y = y0 - height,
            fill = PALETTE[0],
            tip = escape_xml(&format!(
                "{}: {}",
                chart.labels.get(idx).map(String::as_str).unwrap_or_default(),
                format_value(*value)
            )),
        );
        if let Some(label) = chart.labels.get(idx) {
            category_label(&mut svg, x + bar_width / 2.0, label);
        }
    }
    close(svg)
}

fn line_chart(chart: &SeriesChart) -> String {
    let Some(max) = series_max(chart) else {
        return no_data(&chart.title);
    };
    let mut svg = open(&chart.title);
    axes(&mut svg, chart, max);

    let count = chart.values.len();
    let step = if count > 1 {
        plot_width() / (count - 1) as f64
    } else {
        0.0
    };
    let y0 = MARGIN_TOP + plot_height();
    let points: Vec<(f64, f64)> = chart
        .values
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let x = if count > 1 {
                MARGIN_LEFT + idx as f64 * step
            } else {
                MARGIN_LEFT + plot_width() / 2.0
            };
            (x, y0 - value.max(0.0) / max * plot_height())
        })
        .collect();

    let path: Vec<String> = points
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect();
    let _ = write!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        path.join(" "),
        PALETTE[0]
    );

    for (idx, (x, y)) in points.iter().enumerate() {
        let _ = write!(
            svg,
            r#"<circle class="point" cx="{x:.1}" cy="{y:.1}" r="4" fill="{}"/>"#,
            PALETTE[1]
        );
        if let Some(label) = chart.labels.get(idx) {
            category_label(&mut svg, *x, label);
        }
    }
    close(svg)
}

fn pie_chart(chart: &SeriesChart) -> String {
    let total: f64 = chart.values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return no_data(&chart.title);
    }
    let mut svg = open(&chart.title);

    let radius = 140.0;
    let cx = MARGIN_LEFT + radius + 20.0;
    let cy = MARGIN_TOP + 30.0 + radius;
    let slices: Vec<(usize, f64)> = chart
        .values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| *v > 0.0)
        .collect();

    let mut angle = -PI / 2.0;
    for (idx, value) in &slices {
        let fill = PALETTE[idx % PALETTE.len()];
        let share = value / total;
        if share >= 1.0 {
            let _ = write!(
                svg,
                r#"<circle class="slice" cx="{cx:.1}" cy="{cy:.1}" r="{radius}" fill="{fill}"/>"#
            );
            continue;
        }
        let sweep = share * 2.0 * PI;
        let (x1, y1) = (cx + radius * angle.cos(), cy + radius * angle.sin());
        angle += sweep;
        let (x2, y2) = (cx + radius * angle.cos(), cy + radius * angle.sin());
        let large_arc = u8::from(sweep > PI);
        let _ = write!(
            svg,
            r#"<path class="slice" d="M {cx:.1} {cy:.1} L {x1:.2} {y1:.2} A {radius} {radius} 0 {large_arc} 1 {x2:.2} {y2:.2} Z" fill="{fill}" stroke="white"/>"#
        );
    }

    let legend_x = cx + radius + 50.0;
    for (row, (idx, value)) in slices.iter().enumerate() {
        let y = MARGIN_TOP + 30.0 + row as f64 * 22.0;
        let label = chart.labels.get(*idx).map(String::as_str).unwrap_or_default();
        let _ = write!(
            svg,
            r#"<rect x="{legend_x:.1}" y="{:.1}" width="14" height="14" fill="{}"/><text class="legend" x="{:.1}" y="{:.1}" font-size="12">{} ({:.1}%)</text>"#,
            y - 11.0,
            PALETTE[idx % PALETTE.len()],
            legend_x + 20.0,
            y,
            escape_xml(&short_label(label)),
            value / total * 100.0,
        );
    }
    close(svg)
}

fn single_value(value: f64, label: &str, title: &str) -> String {
    let mut svg = open(title);
    let _ = write!(
        svg,
        r##"<text class="value" x="{x}" y="{vy}" text-anchor="middle" font-size="64" font-weight="bold" fill="{fill}">{value}</text><text x="{x}" y="{ly}" text-anchor="middle" font-size="18" fill="#555">{label}</text>"##,
        x = WIDTH / 2.0,
        vy = HEIGHT / 2.0 + 10.0,
        ly = HEIGHT / 2.0 + 50.0,
        fill = PALETTE[0],
        value = format_value(value),
        label = escape_xml(label),
    );
    close(svg)
}
