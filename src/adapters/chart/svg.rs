use std::fmt::Write;

use crate::domain::{MetricColumn, MetricSample};
use crate::ports::{Chart, ChartError, ChartRenderer};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 50.0;

/// Renders one metric column as an SVG line chart
#[derive(Debug, Default, Clone)]
pub struct SvgChartRenderer;

impl SvgChartRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, column: MetricColumn, samples: &[MetricSample]) -> Result<Chart, ChartError> {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ChartError::NoData(column)),
        };

        let t0 = first.timestamp.timestamp() as f64;
        let span = (last.timestamp.timestamp() as f64 - t0).max(1.0);

        let values: Vec<f64> = samples.iter().map(|s| s.value(column)).collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ChartError::Render(format!("non-finite value in {}", column)));
        }

        let (mut lo, mut hi) = match column {
            MetricColumn::Network => (
                values.iter().copied().fold(f64::INFINITY, f64::min),
                values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ),
            _ => (0.0, 100.0_f64.max(values.iter().copied().fold(0.0, f64::max))),
        };
        if hi - lo < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }

        let plot_w = WIDTH - 2.0 * MARGIN;
        let plot_h = HEIGHT - 2.0 * MARGIN;
        let x = |ts: f64| MARGIN + (ts - t0) / span * plot_w;
        let y = |v: f64| HEIGHT - MARGIN - (v - lo) / (hi - lo) * plot_h;

        let mut points = String::new();
        for (sample, value) in samples.iter().zip(&values) {
            let _ = write!(
                points,
                "{:.1},{:.1} ",
                x(sample.timestamp.timestamp() as f64),
                y(*value)
            );
        }

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = WIDTH,
            h = HEIGHT
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="25" font-family="sans-serif" font-size="16" text-anchor="middle">{} ({})</text>"#,
            WIDTH / 2.0,
            column,
            column.unit()
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="black"/><line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="black"/>"#,
            m = MARGIN,
            b = HEIGHT - MARGIN,
            r = WIDTH - MARGIN
        );
        let _ = writeln!(
            svg,
            r#"<text x="5" y="{}" font-family="sans-serif" font-size="10">{:.1}</text><text x="5" y="{}" font-family="sans-serif" font-size="10">{:.1}</text>"#,
            MARGIN,
            hi,
            HEIGHT - MARGIN,
            lo
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="10">{}</text><text x="{}" y="{}" font-family="sans-serif" font-size="10" text-anchor="end">{}</text>"#,
            MARGIN,
            HEIGHT - MARGIN / 2.0,
            first.timestamp.format("%Y-%m-%d %H:%M"),
            WIDTH - MARGIN,
            HEIGHT - MARGIN / 2.0,
            last.timestamp.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="steelblue" stroke-width="2" points="{}"/>"#,
            points.trim_end()
        );
        svg.push_str("</svg>\n");

        Ok(Chart {
            file_name: format!("{}.svg", column),
            mime_type: "image/svg+xml",
            bytes: svg.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(n: i64) -> Vec<MetricSample> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| MetricSample::new(start + Duration::hours(i), 10.0 + i as f64, 50.0, 70.0, 1_000 * i as u64))
            .collect()
    }

    #[test]
    fn test_render_polyline_with_one_point_per_sample() {
        let chart = SvgChartRenderer::new()
            .render(MetricColumn::Cpu, &series(5))
            .unwrap();

        let svg = String::from_utf8(chart.bytes).unwrap();
        assert_eq!(chart.file_name, "cpu.svg");
        assert_eq!(chart.mime_type, "image/svg+xml");
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("cpu (%)"));

        let points = svg
            .lines()
            .find(|l| l.starts_with("<polyline"))
            .unwrap();
        assert_eq!(points.matches(',').count(), 5);
    }

    #[test]
    fn test_render_single_sample_and_flat_network() {
        let mut samples = series(1);
        samples[0].network_total_bytes = 42;
        let chart = SvgChartRenderer::new()
            .render(MetricColumn::Network, &samples)
            .unwrap();
        assert!(String::from_utf8(chart.bytes).unwrap().contains("network (bytes)"));
    }

    #[test]
    fn test_render_empty_is_error() {
        assert!(matches!(
            SvgChartRenderer::new().render(MetricColumn::Ram, &[]),
            Err(ChartError::NoData(MetricColumn::Ram))
        ));
    }
}
