//! Run aggregation and report analysis.
//!
//! Runs are folded into one series per probe key, in run order. Reports
//! then reduce those series to stats.

use crate::error::{FresnelError, Result};
use crate::models::{AnalysedMetrics, CombinedSeries, RunData};
use crate::registry::Registry;
use crate::reports::Report;
use std::collections::BTreeMap;
use tracing::debug;

/// Combine the data of all runs.
///
/// ```text
/// runs:     [{ probe: { x: 1.4 } }, { probe: { x: 2.1 } }]
/// combined: { probe: { x: [1.4, 2.1] } }
/// ```
///
/// Keys reported by only some runs get shorter series.
pub fn combine(runs: &[RunData]) -> CombinedSeries {
    let mut combined = CombinedSeries::default();

    for run in runs {
        for (probe, bucket) in run {
            let data = combined.0.entry(probe.clone()).or_default();
            for (key, value) in bucket {
                data.entry(key.clone()).or_default().push(value.clone());
            }
        }
    }

    combined
}

/// Run every metric of the named reports over a combined series.
pub fn analyse(
    reports: &Registry<Report>,
    names: &[String],
    combined: &CombinedSeries,
) -> Result<AnalysedMetrics> {
    let mut analysed = AnalysedMetrics::new();

    for name in names {
        let report = reports.get_named(name)?;
        let mut metrics = BTreeMap::new();

        for (key, metric) in &report.metrics {
            let stats = metric
                .run_analyse(combined)
                .map_err(|source| FresnelError::Analysis {
                    report: name.clone(),
                    metric: key.clone(),
                    source,
                })?;
            debug!(
                "{}.{}: mean {:.3}, stdev {:.3}",
                name, key, stats.mean, stats.stdev
            );
            metrics.insert(key.clone(), stats);
        }

        analysed.insert(name.clone(), metrics);
    }

    Ok(analysed)
}
