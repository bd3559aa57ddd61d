//! Comparison rendering.
//!
//! Renders a [`Comparison`] as a plain-text table (optionally colored),
//! as Markdown, or as JSON.

use crate::models::{ComparedMetric, Comparison, Judgement};
use anyhow::Result;

const GREEN: &str = "\u{1b}[32m";
const RED: &str = "\u{1b}[31m";
const RESET: &str = "\u{1b}[0m";

/// Format a number with its unit for humans.
///
/// ```text
/// format_value(117.0, "ms", false)    => "117 ms"
/// format_value(1050.0, "ms", false)   => "1.050 s"
/// format_value(-0.25, "ms", true)     => "- <0.3 ms"
/// format_value(153_000.0, "B", false) => "153 kB"
/// format_value(0.42, "P", false)      => "P 0.420"
/// ```
///
/// With `plus`, the sign is always shown (`+ `, `- ` or blank).
pub fn format_value(num: f64, unit: &str, plus: bool) -> String {
    if unit == "P" {
        return format!("P {:.3}", num);
    }

    let prefix = if num < 0.0 {
        "- "
    } else if plus && num > 0.0 {
        "+ "
    } else if plus {
        "  "
    } else {
        ""
    };
    let abs = num.abs();

    let value = if abs == 0.0 {
        format!("0 {}", unit)
    } else if abs < 1.0 {
        match (abs * 10.0).ceil() as u32 {
            10 => format!("<1 {}", unit),
            tenth => format!("<0.{} {}", tenth, unit),
        }
    } else {
        match unit {
            "ms" => {
                let total = abs.round() as u64;
                if total >= 1000 {
                    format!("{}.{:03} s", total / 1000, total % 1000)
                } else {
                    format!("{} ms", total)
                }
            }
            "B" if abs > 1_000_000.0 => format!("{:.1} MB", abs / 1_000_000.0),
            "B" if abs > 100_000.0 => format!("{:.0} kB", abs / 1000.0),
            "B" if abs > 1000.0 => format!("{:.1} kB", abs / 1000.0),
            _ => format!("{} {}", abs.round(), unit),
        }
    };

    format!("{}{}", prefix, value.trim_end())
}

/// One row of the comparison table.
struct Row {
    cells: [String; 5],
    judgement: Judgement,
}

impl Row {
    fn group(name: &str) -> Self {
        Self {
            cells: [format!("{}:", name), String::new(), String::new(), String::new(), String::new()],
            judgement: Judgement::Neutral,
        }
    }

    fn metric(key: &str, metric: &ComparedMetric) -> Self {
        let stat = |mean: f64, stdev: f64| {
            format!(
                "{} (± {})",
                format_value(mean, &metric.unit, false),
                format_value(stdev, &metric.unit, false)
            )
        };
        Self {
            cells: [
                format!("  {} ({})", metric.caption, key),
                stat(metric.a.mean, metric.a.stdev),
                stat(metric.b.mean, metric.b.stdev),
                format_value(metric.diff, &metric.compare_unit, true),
                metric.judgement.mark().to_string(),
            ],
            judgement: metric.judgement,
        }
    }
}

const HEADER: [&str; 5] = ["Metric", "Before", "After", "Diff", ""];

fn width(text: &str) -> usize {
    text.chars().count()
}

/// Render a comparison as text tables, one per scenario.
pub fn generate_text_comparison(comparison: &Comparison, color: bool) -> String {
    let mut output = String::new();

    for (scenario, reports) in &comparison.result {
        let mut rows = Vec::new();
        for (report, metrics) in reports {
            rows.push(Row::group(report));
            for (key, metric) in metrics {
                rows.push(Row::metric(key, metric));
            }
        }

        let mut widths: Vec<usize> = HEADER.iter().map(|h| width(h)).collect();
        for row in &rows {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(width(cell));
            }
        }
        // One column of padding.
        let widths: Vec<usize> = widths.into_iter().map(|w| w + 1).collect();

        let border = format!(
            "|-{}-|",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-|-")
        );
        let line = |cells: &[String], judgement: Judgement| {
            let paint = match judgement {
                Judgement::Improvement if color => Some(GREEN),
                Judgement::Regression if color => Some(RED),
                _ => None,
            };
            let cells: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let padded = if i == 0 {
                        format!("{:<w$}", cell, w = widths[i])
                    } else {
                        format!("{:>w$}", cell, w = widths[i])
                    };
                    match paint {
                        Some(code) if i >= 3 => format!("{}{}{}", code, padded, RESET),
                        _ => padded,
                    }
                })
                .collect();
            format!("| {} |", cells.join(" | "))
        };

        output.push_str(&format!("\n\n### scenario {}\n", scenario));
        output.push_str(&border);
        output.push('\n');
        let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        output.push_str(&line(&header, Judgement::Neutral));
        output.push('\n');
        output.push_str(&border);
        output.push('\n');
        for row in &rows {
            output.push_str(&line(&row.cells, row.judgement));
            output.push('\n');
        }
        output.push_str(&border);
        output.push('\n');
    }

    output
}

/// Render a comparison as Markdown.
pub fn generate_markdown_comparison(comparison: &Comparison) -> String {
    let mut output = String::new();

    output.push_str("# Fresnel Comparison\n\n");

    if comparison.warnings.is_empty() {
        output.push_str("No regressions found.\n\n");
    } else {
        output.push_str(&format!(
            "**{} regression(s) found.**\n\n",
            comparison.warnings.len()
        ));
        for warning in &comparison.warnings {
            output.push_str(&format!(
                "- `{}` {}: {} ({})\n",
                warning.scenario,
                warning.report,
                warning.caption,
                format_value(warning.diff, &warning.compare_unit, true)
            ));
        }
        output.push('\n');
    }

    for (scenario, reports) in &comparison.result {
        output.push_str(&format!("## Scenario `{}`\n\n", scenario));
        output.push_str("| Metric | Before | After | Diff | |\n");
        output.push_str("|---|---:|---:|---:|:-:|\n");
        for (report, metrics) in reports {
            output.push_str(&format!("| **{}** | | | | |\n", report));
            for (key, metric) in metrics {
                let row = Row::metric(key, metric);
                output.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    row.cells[0].trim(),
                    row.cells[1],
                    row.cells[2],
                    row.cells[3].trim(),
                    row.cells[4]
                ));
            }
        }
        output.push('\n');
    }

    output.push_str("---\n\n");
    output.push_str("*Generated by Fresnel*\n");

    output
}

/// Render a comparison as JSON.
pub fn generate_json_comparison(comparison: &Comparison) -> Result<String> {
    serde_json::to_string_pretty(comparison).map_err(Into::into)
}
