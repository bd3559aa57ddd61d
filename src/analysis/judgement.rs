//! Comparison of two analysed records.

use super::stats::diff_mann_whitney;
use crate::error::Result;
use crate::models::{ComparedMetric, Comparison, Judgement, Record, Warning};
use crate::registry::Registry;
use crate::reports::Report;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Default significance level for the Mann-Whitney method.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.95;

/// Classify a difference against a metric threshold.
///
/// Metrics with a positive threshold are "lower is better": a difference
/// above the threshold is a regression, a decrease by more than the
/// threshold an improvement. Anything else is neutral.
pub fn judge(threshold: Option<f64>, diff: f64) -> Judgement {
    match threshold {
        Some(threshold) if threshold > 0.0 => {
            if diff > threshold {
                Judgement::Regression
            } else if diff < 0.0 && diff.abs() > threshold {
                Judgement::Improvement
            } else {
                Judgement::Neutral
            }
        }
        _ => Judgement::Neutral,
    }
}

/// Classify a Mann-Whitney difference against a significance level.
///
/// `diff` is the evidence that the metric increased, so values close to 1
/// are regressions and values close to 0 improvements.
pub fn judge_significance(significance: f64, diff: f64) -> Judgement {
    if diff > significance {
        Judgement::Regression
    } else if diff < 1.0 - significance {
        Judgement::Improvement
    } else {
        Judgement::Neutral
    }
}

/// How differences between two stats are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMethod {
    /// Each metric's own comparison, judged against its threshold.
    #[default]
    Declared,
    /// Mann-Whitney U test, judged against the significance level.
    MannWhitney,
}

impl std::fmt::Display for CompareMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMethod::Declared => write!(f, "declared"),
            CompareMethod::MannWhitney => write!(f, "mann-whitney"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    pub method: CompareMethod,
    pub significance: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            method: CompareMethod::Declared,
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}

/// Compare every analysed metric of `before` with `after`.
///
/// Scenarios or metrics present on only one side are skipped. A report
/// that is no longer registered fails the comparison.
pub fn compare_records(
    before: &Record,
    after: &Record,
    reports: &Registry<Report>,
    options: &CompareOptions,
) -> Result<Comparison> {
    let mut comparison = Comparison::default();

    for (scenario_key, scenario_a) in &before.scenarios {
        let Some(scenario_b) = after.scenarios.get(scenario_key) else {
            warn!("Scenario \"{}\" is missing from the second record, skipping", scenario_key);
            continue;
        };
        let compared = comparison.result.entry(scenario_key.clone()).or_default();

        for (report_name, analysed_a) in &scenario_a.analysed {
            let report = reports.get_named(report_name)?;
            let compared_report = compared.entry(report_name.clone()).or_default();

            for (metric_key, metric) in &report.metrics {
                let a = analysed_a.get(metric_key);
                let b = scenario_b
                    .analysed
                    .get(report_name)
                    .and_then(|metrics| metrics.get(metric_key));
                let (Some(a), Some(b)) = (a, b) else {
                    debug!(
                        "{}: {}.{} not in both records, skipping",
                        scenario_key, report_name, metric_key
                    );
                    continue;
                };

                let (diff, compare_unit, judgement) = match options.method {
                    CompareMethod::Declared => {
                        let diff = metric.run_compare(a, b);
                        (diff, metric.diff_unit().to_string(), judge(metric.threshold, diff))
                    }
                    CompareMethod::MannWhitney => {
                        let diff = diff_mann_whitney(a, b);
                        let gating = metric.threshold.is_some_and(|t| t > 0.0);
                        let judgement = if gating {
                            judge_significance(options.significance, diff)
                        } else {
                            Judgement::Neutral
                        };
                        (diff, "P".to_string(), judgement)
                    }
                };

                if judgement == Judgement::Regression {
                    comparison.warnings.push(Warning {
                        scenario: scenario_key.clone(),
                        report: report_name.clone(),
                        metric: metric_key.clone(),
                        caption: metric.caption.clone(),
                        diff,
                        compare_unit: compare_unit.clone(),
                    });
                }

                compared_report.insert(
                    metric_key.clone(),
                    ComparedMetric {
                        caption: metric.caption.clone(),
                        unit: metric.unit.clone(),
                        a: a.clone(),
                        b: b.clone(),
                        diff,
                        compare_unit,
                        judgement,
                    },
                );
            }
        }
    }

    Ok(comparison)
}

/// Count judgements across a comparison, keyed by verdict.
pub fn tally(comparison: &Comparison) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for metric in comparison
        .result
        .values()
        .flat_map(|reports| reports.values())
        .flat_map(|metrics| metrics.values())
    {
        *counts.entry(metric.judgement.to_string()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::stats;
    use crate::models::{CombinedSeries, ScenarioOptions, ScenarioRecord, Stats, Viewport};
    use crate::reports::{self, Metric};
    use indexmap::IndexMap;

    fn record(scenario: &str, report: &str, metrics: Vec<(&str, Stats)>) -> Record {
        let analysed = BTreeMap::from([(
            report.to_string(),
            metrics
                .into_iter()
                .map(|(key, stats)| (key.to_string(), stats))
                .collect(),
        )]);
        let scenario_record = ScenarioRecord {
            options: ScenarioOptions {
                url: "https://example.org/".to_string(),
                viewport: Viewport {
                    width: 800.0,
                    height: 600.0,
                },
                reports: vec![report.to_string()],
            },
            runs: Vec::new(),
            combined: CombinedSeries::default(),
            analysed,
        };
        Record {
            scenarios: IndexMap::from([(scenario.to_string(), scenario_record)]),
        }
    }

    fn example_registry() -> Registry<Report> {
        Registry::new().with(
            "example",
            Report::new(["x"])
                .metric("slow", Metric::series("Gating", "ms", "x", "slow").threshold(1.0))
                .metric("info", Metric::series("Info", "ms", "x", "info")),
        )
    }

    #[test]
    fn test_judge() {
        assert_eq!(judge(Some(1.0), 1.5), Judgement::Regression);
        assert_eq!(judge(Some(1.0), -1.5), Judgement::Improvement);
        assert_eq!(judge(Some(1.0), 0.5), Judgement::Neutral);
        assert_eq!(judge(Some(1.0), -0.5), Judgement::Neutral);
        assert_eq!(judge(Some(1.0), 1.0), Judgement::Neutral);
        assert_eq!(judge(None, 100.0), Judgement::Neutral);
        assert_eq!(judge(Some(0.0), 100.0), Judgement::Neutral);
        assert_eq!(judge(Some(-1.0), -100.0), Judgement::Neutral);
    }

    #[test]
    fn test_judge_significance() {
        assert_eq!(judge_significance(0.95, 0.99), Judgement::Regression);
        assert_eq!(judge_significance(0.95, 0.001), Judgement::Improvement);
        assert_eq!(judge_significance(0.95, 0.5), Judgement::Neutral);
        assert_eq!(judge_significance(0.95, 0.95), Judgement::Neutral);
        assert_eq!(judge_significance(0.95, 0.06), Judgement::Neutral);
    }

    #[test]
    fn test_compare_detects_regression() {
        let before = record(
            "home",
            "example",
            vec![
                ("slow", stats(&[10.0, 10.0, 10.0])),
                ("info", stats(&[1.0, 1.0])),
            ],
        );
        let after = record(
            "home",
            "example",
            vec![
                ("slow", stats(&[20.0, 20.0, 20.0])),
                ("info", stats(&[50.0, 50.0])),
            ],
        );

        let comparison =
            compare_records(&before, &after, &example_registry(), &CompareOptions::default())
                .unwrap();

        let slow = &comparison.result["home"]["example"]["slow"];
        assert_eq!(slow.diff, 10.0);
        assert_eq!(slow.judgement, Judgement::Regression);
        assert_eq!(slow.compare_unit, "ms");

        let info = &comparison.result["home"]["example"]["info"];
        assert_eq!(info.judgement, Judgement::Neutral);

        assert!(comparison.is_failing());
        assert_eq!(comparison.warnings.len(), 1);
        assert_eq!(comparison.warnings[0].metric, "slow");
        assert_eq!(comparison.warnings[0].caption, "Gating");
    }

    #[test]
    fn test_compare_improvement_passes() {
        let before = record("home", "example", vec![("slow", stats(&[20.0, 21.0]))]);
        let after = record("home", "example", vec![("slow", stats(&[10.0, 11.0]))]);

        let comparison =
            compare_records(&before, &after, &example_registry(), &CompareOptions::default())
                .unwrap();

        assert_eq!(
            comparison.result["home"]["example"]["slow"].judgement,
            Judgement::Improvement
        );
        assert!(!comparison.is_failing());
        assert_eq!(tally(&comparison).get("improvement"), Some(&1));
    }

    #[test]
    fn test_compare_skips_missing_scenario_and_metric() {
        let before = record("home", "example", vec![("slow", stats(&[1.0]))]);
        let after = record("other", "example", vec![("slow", stats(&[9.0]))]);

        let comparison =
            compare_records(&before, &after, &example_registry(), &CompareOptions::default())
                .unwrap();
        assert!(comparison.result.is_empty());

        // "info" only exists in after.
        let after = record(
            "home",
            "example",
            vec![("slow", stats(&[1.0])), ("info", stats(&[3.0]))],
        );
        let comparison =
            compare_records(&before, &after, &example_registry(), &CompareOptions::default())
                .unwrap();
        let compared = &comparison.result["home"]["example"];
        assert!(compared.contains_key("slow"));
        assert!(!compared.contains_key("info"));
    }

    #[test]
    fn test_compare_unknown_report_fails() {
        let before = record("home", "gone", vec![("slow", stats(&[1.0]))]);
        let err = compare_records(&before, &before, &example_registry(), &CompareOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown report name: gone");
    }

    #[test]
    fn test_compare_builtin_reports() {
        let before = record("home", "navtiming", vec![("loadEventEnd", stats(&[100.0, 102.0]))]);
        let after = record("home", "navtiming", vec![("loadEventEnd", stats(&[100.0, 101.0]))]);

        let comparison =
            compare_records(&before, &after, &reports::registry(), &CompareOptions::default())
                .unwrap();
        let metric = &comparison.result["home"]["navtiming"]["loadEventEnd"];
        assert_eq!(metric.caption, "Total page load time");
        assert_eq!(metric.diff, 0.0);
        assert_eq!(metric.judgement, Judgement::Neutral);
    }

    #[test]
    fn test_compare_mann_whitney() {
        let before = record(
            "home",
            "example",
            vec![
                ("slow", stats(&[1.0, 2.0, 3.0, 4.0, 5.0])),
                ("info", stats(&[1.0, 2.0, 3.0, 4.0, 5.0])),
            ],
        );
        let after = record(
            "home",
            "example",
            vec![
                ("slow", stats(&[6.0, 7.0, 8.0, 9.0, 10.0])),
                ("info", stats(&[6.0, 7.0, 8.0, 9.0, 10.0])),
            ],
        );
        let options = CompareOptions {
            method: CompareMethod::MannWhitney,
            ..CompareOptions::default()
        };

        let comparison =
            compare_records(&before, &after, &example_registry(), &options).unwrap();

        let slow = &comparison.result["home"]["example"]["slow"];
        assert_eq!(slow.compare_unit, "P");
        assert!(slow.diff > 0.99);
        assert_eq!(slow.judgement, Judgement::Regression);
        assert_eq!(
            comparison.result["home"]["example"]["info"].judgement,
            Judgement::Neutral
        );
        assert_eq!(comparison.warnings.len(), 1);
    }

    #[test]
    fn test_compare_mann_whitney_decrease_is_improvement() {
        let slow: Vec<f64> = (0..7).map(|i| 600.0 + 10.0 * i as f64).collect();
        let fast: Vec<f64> = (0..7).map(|i| 100.0 + 10.0 * i as f64).collect();
        let before = record(
            "home",
            "example",
            vec![("slow", stats(&slow)), ("info", stats(&slow))],
        );
        let after = record(
            "home",
            "example",
            vec![("slow", stats(&fast)), ("info", stats(&fast))],
        );
        let options = CompareOptions {
            method: CompareMethod::MannWhitney,
            ..CompareOptions::default()
        };

        let comparison =
            compare_records(&before, &after, &example_registry(), &options).unwrap();

        let slow = &comparison.result["home"]["example"]["slow"];
        assert!(slow.diff < 0.01, "diff = {}", slow.diff);
        assert_eq!(slow.judgement, Judgement::Improvement);
        assert_eq!(
            comparison.result["home"]["example"]["info"].judgement,
            Judgement::Neutral
        );
        assert!(!comparison.is_failing());
    }

    #[test]
    fn test_compare_keeps_scenario_order() {
        let mut before = record("zeta", "example", vec![("slow", stats(&[1.0]))]);
        let alpha = record("alpha", "example", vec![("slow", stats(&[1.0]))]);
        before.scenarios.extend(alpha.scenarios);

        let comparison =
            compare_records(&before, &before, &example_registry(), &CompareOptions::default())
                .unwrap();
        let keys: Vec<&str> = comparison.result.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_compare_mann_whitney_identical() {
        let before = record("home", "example", vec![("slow", stats(&[5.0; 7]))]);
        let options = CompareOptions {
            method: CompareMethod::MannWhitney,
            ..CompareOptions::default()
        };

        let comparison = compare_records(&before, &before, &example_registry(), &options).unwrap();
        let slow = &comparison.result["home"]["example"]["slow"];
        assert_eq!(slow.diff, 0.0);
        assert_eq!(slow.judgement, Judgement::Neutral);
    }
}
