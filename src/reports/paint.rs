//! Paint Timing metrics.
//!
//! See <https://www.w3.org/TR/paint-timing/>.

use super::{Metric, Report};

pub fn report() -> Report {
    Report::new(["paint"])
        .metric(
            "TTFP",
            Metric::series("Time to first paint", "ms", "paint", "first-paint"),
        )
        .metric(
            "TTFCP",
            Metric::series(
                "Time to first contentful paint",
                "ms",
                "paint",
                "first-contentful-paint",
            ),
        )
}
