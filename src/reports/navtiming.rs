//! Navigation Timing metrics.
//!
//! See <https://www.w3.org/TR/navigation-timing-2/>.

use super::{Metric, Report};
use crate::analysis::stats::{diff_stdev, stats, subtract};
use crate::models::{CombinedSeries, Stats};

/// Stats over `end - start` for each run.
fn span(series: &CombinedSeries, end: &str, start: &str) -> anyhow::Result<Stats> {
    let end = series.numbers("navtiming", end)?;
    let start = series.numbers("navtiming", start)?;
    Ok(stats(&subtract(&end, &start)))
}

pub fn report() -> Report {
    Report::new(["navtiming"])
        .metric(
            "responseStart",
            Metric::series("Time to first byte", "ms", "navtiming", "responseStart"),
        )
        .metric(
            "loadEventEnd",
            Metric::series("Total page load time", "ms", "navtiming", "loadEventEnd")
                .threshold(1.0),
        )
        .metric(
            "processing",
            Metric::new("Time from responseEnd to domComplete", "ms")
                .analyse(|series| span(series, "domComplete", "responseEnd"))
                .compare(diff_stdev)
                .threshold(10.0),
        )
        .metric(
            "onLoad",
            Metric::new("Time from loadEventStart to loadEventEnd", "ms")
                .analyse(|series| span(series, "loadEventEnd", "loadEventStart"))
                .compare(diff_stdev)
                .threshold(1.0),
        )
}
