//! Projection Renderer: maps validated projections to chart specifications
//! and formatted metrics. Pure; the front end draws whatever comes out.

use serde::Serialize;

use crate::lookup::NOT_AVAILABLE;
use crate::projection::models::{ImpactNote, Projection, TransitionYear, YearPoint};

const X_AXIS_TITLE: &str = "Year";
const Y_AXIS_TITLE: &str = "Amount ($)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Line,
    LineMarkers,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDash {
    Solid,
    Dot,
    Dash,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub kind: SeriesKind,
    pub x: Vec<u32>,
    pub y: Vec<f64>,
    pub color: &'static str,
    pub dash: LineDash,
    pub width: Option<f32>,
    pub opacity: Option<f32>,
}

impl ChartSeries {
    fn new(
        name: impl Into<String>,
        kind: SeriesKind,
        points: &[YearPoint],
        pick: fn(&YearPoint) -> f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            x: points.iter().map(|p| p.year).collect(),
            y: points.iter().map(pick).collect(),
            color: "black",
            dash: LineDash::Solid,
            width: None,
            opacity: None,
        }
    }

    fn color(mut self, color: &'static str) -> Self {
        self.color = color;
        self
    }

    fn dash(mut self, dash: LineDash) -> Self {
        self.dash = dash;
        self
    }

    fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

/// A vertical line across the plot, e.g. the transition year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerticalMarker {
    pub x: u32,
    pub label: String,
    pub color: &'static str,
    pub dash: LineDash,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: &'static str,
    pub x_axis_title: &'static str,
    pub y_axis_title: &'static str,
    /// `"group"` when bars sit side by side.
    pub bar_mode: Option<&'static str>,
    pub series: Vec<ChartSeries>,
    pub markers: Vec<VerticalMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: &'static str,
    pub value: String,
}

impl Metric {
    fn currency(label: &'static str, value: Option<f64>) -> Self {
        Self {
            label,
            value: value
                .map(format_currency)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedProjection {
    pub chart: ChartSpec,
    pub metrics: Vec<Metric>,
    pub impact: Vec<ImpactNote>,
}

fn net_worth(p: &YearPoint) -> f64 {
    p.net_worth
}

fn income(p: &YearPoint) -> f64 {
    p.income
}

fn expenses(p: &YearPoint) -> f64 {
    p.expenses
}

/// Net worth as a line, income and expenses as grouped bars.
pub fn render_projection(projection: &Projection) -> RenderedProjection {
    let points = projection.series.points();
    let summary = &projection.summary;

    RenderedProjection {
        chart: ChartSpec {
            title: "15-Year Financial Projection",
            x_axis_title: X_AXIS_TITLE,
            y_axis_title: Y_AXIS_TITLE,
            bar_mode: Some("group"),
            series: vec![
                ChartSeries::new("Net Worth", SeriesKind::LineMarkers, points, net_worth)
                    .color("green")
                    .width(3.0),
                ChartSeries::new("Income", SeriesKind::Bar, points, income)
                    .color("blue")
                    .opacity(0.6),
                ChartSeries::new("Expenses", SeriesKind::Bar, points, expenses)
                    .color("red")
                    .opacity(0.6),
            ],
            markers: Vec::new(),
        },
        metrics: vec![
            Metric::currency("Total Net Worth", Some(summary.total_net_worth)),
            Metric::currency("Peak Net Worth", Some(summary.peak_net_worth)),
            Metric::currency("Average Growth", summary.average_growth),
        ],
        impact: projection.impact.clone(),
    }
}

/// Dotted original against solid revised, one pair per measure.
pub fn render_comparison(original: &Projection, revised: &Projection) -> RenderedProjection {
    let before = original.series.points();
    let after = revised.series.points();

    let mut series = Vec::with_capacity(6);
    for (label, color, pick) in [
        ("Net Worth", "blue", net_worth as fn(&YearPoint) -> f64),
        ("Income", "green", income),
        ("Expenses", "red", expenses),
    ] {
        series.push(
            ChartSeries::new(format!("Original {label}"), SeriesKind::Line, before, pick)
                .color(color)
                .dash(LineDash::Dot),
        );
        series.push(
            ChartSeries::new(format!("Revised {label}"), SeriesKind::Line, after, pick)
                .color(color),
        );
    }

    RenderedProjection {
        chart: ChartSpec {
            title: "15-Year Financial Projection Comparison",
            x_axis_title: "Years",
            y_axis_title: Y_AXIS_TITLE,
            bar_mode: None,
            series,
            markers: Vec::new(),
        },
        metrics: vec![
            Metric::currency("Revised Total Net Worth", Some(revised.summary.total_net_worth)),
            Metric::currency("Revised Peak Net Worth", Some(revised.summary.peak_net_worth)),
            Metric::currency(
                "Net Worth Change",
                Some(revised.summary.total_net_worth - original.summary.total_net_worth),
            ),
        ],
        impact: revised.impact.clone(),
    }
}

/// Both net-worth paths from the transition year on, with a marker at that year.
pub fn render_transition(
    original: &Projection,
    transitioned: &Projection,
    year: TransitionYear,
) -> RenderedProjection {
    let year = year.get();

    RenderedProjection {
        chart: ChartSpec {
            title: "Financial Impact of Career/Education Change",
            x_axis_title: X_AXIS_TITLE,
            y_axis_title: Y_AXIS_TITLE,
            bar_mode: None,
            series: vec![
                ChartSeries::new(
                    "Original Path",
                    SeriesKind::LineMarkers,
                    original.series.from_year(year),
                    net_worth,
                )
                .color("blue")
                .dash(LineDash::Dash)
                .width(2.0),
                ChartSeries::new(
                    "New Path",
                    SeriesKind::LineMarkers,
                    transitioned.series.from_year(year),
                    net_worth,
                )
                .color("green")
                .width(3.0),
            ],
            markers: vec![VerticalMarker {
                x: year,
                label: format!("Career Change (Year {year})"),
                color: "red",
                dash: LineDash::Dash,
            }],
        },
        metrics: vec![
            Metric::currency(
                "Net Worth Impact",
                Some(transitioned.summary.total_net_worth - original.summary.total_net_worth),
            ),
            Metric::currency("Transition Cost", transitioned.summary.transition_cost),
        ],
        impact: transitioned.impact.clone(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Currency formatting
// ────────────────────────────────────────────────────────────────────────────

/// `1234.5` → `"$1,234.50"`, `-42.0` → `"-$42.00"`. Non-finite values → `"N/A"`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // "-0.00" would be misleading after rounding.
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

/// Parses a plain or comma-grouped number such as `"165,320"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Formats a raw salary cell or user input. Anything that is not a finite
/// number renders as `"N/A"`.
///
/// Deliberately more lenient than a bare float parse: comma-grouped cells
/// such as `"165,320"` are accepted rather than rendered as `"N/A"`.
pub fn format_salary(raw: &str) -> String {
    parse_amount(raw)
        .map(format_currency)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::models::ImpactPairing;
    use crate::projection::parser::fixtures::{chart_text, revision_text, transition_text};
    use crate::projection::parser::parse_projection;

    fn parsed(text: &str) -> Projection {
        parse_projection(text, ImpactPairing::Truncate).unwrap()
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-98_765.4), "-$98,765.40");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(f64::NAN), "N/A");
    }

    #[test]
    fn test_format_salary() {
        assert_eq!(format_salary("1234.5"), "$1,234.50");
        assert_eq!(format_salary(" 165320 "), "$165,320.00");
        assert_eq!(format_salary("abc"), "N/A");
        assert_eq!(format_salary("*"), "N/A");
        assert_eq!(format_salary(""), "N/A");
        assert_eq!(format_salary("inf"), "N/A");
        assert_eq!(format_salary("165,320"), "$165,320.00");
    }

    #[test]
    fn test_render_projection_has_aligned_series() {
        let rendered = render_projection(&parsed(&chart_text()));
        assert_eq!(rendered.chart.series.len(), 3);
        for series in &rendered.chart.series {
            assert_eq!(series.x, (1..=15).collect::<Vec<u32>>());
            assert_eq!(series.y.len(), 15);
        }
        assert_eq!(rendered.chart.series[0].kind, SeriesKind::LineMarkers);
        assert_eq!(rendered.chart.series[1].kind, SeriesKind::Bar);
        assert_eq!(rendered.chart.bar_mode, Some("group"));
        assert_eq!(rendered.metrics[0].value, "$265,000.00");
        assert_eq!(rendered.metrics[2].value, "$19,666.67");
    }

    #[test]
    fn test_render_projection_missing_growth_is_na() {
        let rendered = render_projection(&parsed(&revision_text()));
        assert_eq!(rendered.metrics[2].label, "Average Growth");
        assert_eq!(rendered.metrics[2].value, "N/A");
    }

    #[test]
    fn test_render_comparison_dotted_original_solid_revised() {
        let rendered = render_comparison(&parsed(&chart_text()), &parsed(&revision_text()));
        assert_eq!(rendered.chart.series.len(), 6);
        assert_eq!(rendered.chart.series[0].name, "Original Net Worth");
        assert_eq!(rendered.chart.series[0].dash, LineDash::Dot);
        assert_eq!(rendered.chart.series[1].name, "Revised Net Worth");
        assert_eq!(rendered.chart.series[1].dash, LineDash::Solid);
        assert_eq!(rendered.metrics[2].value, "-$55,000.00");
        assert_eq!(rendered.impact.len(), 2);
    }

    #[test]
    fn test_render_transition_slices_from_year_and_marks_it() {
        let year = TransitionYear::try_from(6).unwrap();
        let rendered =
            render_transition(&parsed(&chart_text()), &parsed(&transition_text()), year);

        let original = &rendered.chart.series[0];
        let new_path = &rendered.chart.series[1];
        assert_eq!(original.x.first(), Some(&6));
        assert_eq!(original.x.len(), 10);
        assert_eq!(new_path.y.first(), Some(&-120000.0));
        assert_eq!(original.dash, LineDash::Dash);

        assert_eq!(rendered.chart.markers.len(), 1);
        assert_eq!(rendered.chart.markers[0].x, 6);
        assert_eq!(rendered.chart.markers[0].label, "Career Change (Year 6)");

        assert_eq!(rendered.metrics[0].value, "-$40,000.00");
        assert_eq!(rendered.metrics[1].value, "$45,000.00");
    }

    #[test]
    fn test_render_transition_year_bounds_inclusive() {
        let original = parsed(&chart_text());
        let first = render_transition(&original, &original, TransitionYear::try_from(1).unwrap());
        assert_eq!(first.chart.series[0].x.len(), 15);
        let last = render_transition(&original, &original, TransitionYear::try_from(15).unwrap());
        assert_eq!(last.chart.series[0].x, vec![15]);
        assert_eq!(last.metrics[1].value, "N/A");
    }
}
