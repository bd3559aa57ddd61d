//! Reports turn combined probe data into metrics.
//!
//! A report names the probes it needs and a set of metrics. Each metric
//! knows how to analyse the combined series of a scenario into [`Stats`],
//! and how to compare two such stats from different recordings.
//!
//! ```text
//! Report::new(["navtiming"]).metric(
//!     "loadEventEnd",
//!     Metric::new("Total page load time", "ms")
//!         .analyse(|series| Ok(stats(&series.numbers("navtiming", "loadEventEnd")?)))
//!         .compare(diff_stdev)
//!         .threshold(1.0),
//! )
//! ```
//!
//! A metric with a positive `threshold` gates comparisons: a compared
//! difference above it is a regression. Without one it is informational.

pub mod navtiming;
pub mod paint;
pub mod transfer;

use crate::analysis::stats::{diff_stdev, stats};
use crate::error::{FresnelError, Result};
use crate::models::{CombinedSeries, Stats};
use crate::registry::shape::{self, Shaped, TypeTag};
use crate::registry::{Capability, Registry};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type AnalyseFn = Arc<dyn Fn(&CombinedSeries) -> anyhow::Result<Stats> + Send + Sync>;
pub type CompareFn = Arc<dyn Fn(&Stats, &Stats) -> f64 + Send + Sync>;

/// One metric of a report.
#[derive(Clone)]
pub struct Metric {
    pub caption: String,
    pub unit: String,
    pub analyse: Option<AnalyseFn>,
    pub compare: Option<CompareFn>,
    pub threshold: Option<f64>,
    pub compare_unit: Option<String>,
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("caption", &self.caption)
            .field("unit", &self.unit)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Metric {
    pub fn new(caption: &str, unit: &str) -> Self {
        Self {
            caption: caption.to_string(),
            unit: unit.to_string(),
            analyse: None,
            compare: None,
            threshold: None,
            compare_unit: None,
        }
    }

    pub fn analyse<F>(mut self, f: F) -> Self
    where
        F: Fn(&CombinedSeries) -> anyhow::Result<Stats> + Send + Sync + 'static,
    {
        self.analyse = Some(Arc::new(f));
        self
    }

    pub fn compare<F>(mut self, f: F) -> Self
    where
        F: Fn(&Stats, &Stats) -> f64 + Send + Sync + 'static,
    {
        self.compare = Some(Arc::new(f));
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[allow(dead_code)]
    pub fn compare_unit(mut self, unit: &str) -> Self {
        self.compare_unit = Some(unit.to_string());
        self
    }

    /// Stats of a numeric probe key, compared by stdev overlap.
    pub fn series(caption: &str, unit: &str, probe: &'static str, key: &'static str) -> Self {
        Self::new(caption, unit)
            .analyse(move |series| Ok(stats(&series.numbers(probe, key)?)))
            .compare(diff_stdev)
    }

    /// Unit of the compared difference.
    pub fn diff_unit(&self) -> &str {
        self.compare_unit.as_deref().unwrap_or(&self.unit)
    }

    pub fn run_analyse(&self, series: &CombinedSeries) -> anyhow::Result<Stats> {
        match &self.analyse {
            Some(analyse) => analyse(series),
            None => anyhow::bail!("Metric \"{}\" has no analyse callback", self.caption),
        }
    }

    pub fn run_compare(&self, a: &Stats, b: &Stats) -> f64 {
        match &self.compare {
            Some(compare) => compare(a, b),
            None => f64::NAN,
        }
    }
}

impl Shaped for Metric {
    fn shape_view(&self) -> Option<BTreeMap<String, TypeTag>> {
        Some(BTreeMap::from([
            ("caption".to_string(), TypeTag::String),
            ("unit".to_string(), TypeTag::String),
            ("analyse".to_string(), TypeTag::optional(&self.analyse, TypeTag::Function)),
            ("compare".to_string(), TypeTag::optional(&self.compare, TypeTag::Function)),
            ("threshold".to_string(), TypeTag::optional(&self.threshold, TypeTag::Number)),
            (
                "compareUnit".to_string(),
                TypeTag::optional(&self.compare_unit, TypeTag::String),
            ),
        ]))
    }
}

/// A report definition.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub name: Option<String>,
    pub probes: Vec<String>,
    pub metrics: BTreeMap<String, Metric>,
}

impl Report {
    pub fn new<I, S>(probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            probes: probes.into_iter().map(Into::into).collect(),
            metrics: BTreeMap::new(),
        }
    }

    #[allow(dead_code)]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn metric(mut self, key: &str, metric: Metric) -> Self {
        self.metrics.insert(key.to_string(), metric);
        self
    }

    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl Shaped for Report {
    fn shape_view(&self) -> Option<BTreeMap<String, TypeTag>> {
        Some(BTreeMap::from([
            ("name".to_string(), TypeTag::optional(&self.name, TypeTag::String)),
            ("probes".to_string(), TypeTag::Array),
            ("metrics".to_string(), TypeTag::Object),
        ]))
    }
}

impl Capability for Report {
    const KIND: &'static str = "report";

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn with_default_name(mut self, name: &str) -> Self {
        self.name.get_or_insert_with(|| name.to_string());
        self
    }

    fn validate(&self) -> Result<()> {
        shape::like(self, &shape::REPORT)?;
        if self.key().is_empty() {
            return Err(FresnelError::validation("report", "Empty \"name\""));
        }
        for metric in self.metrics.values() {
            shape::like(metric, &shape::METRIC)?;
        }
        Ok(())
    }
}

/// The built-in reports.
pub fn registry() -> Registry<Report> {
    Registry::new()
        .with("navtiming", navtiming::report())
        .with("paint", paint::report())
        .with("transfer", transfer::report())
}
