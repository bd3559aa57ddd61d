//! Data models for recordings and comparisons.
//!
//! This module contains the structures that are persisted in `record.json`
//! and the result structures produced when two records are compared.

use crate::error::{FresnelError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of a persisted record inside its label directory.
pub const RECORD_FILE: &str = "record.json";

/// Browser viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Descriptive statistics over one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Population mean.
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    /// The series the stats were computed from, in run order.
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Data reported by one probe during one run.
pub type ProbeBucket = BTreeMap<String, Value>;

/// Data of one run, keyed by probe name.
pub type RunData = BTreeMap<String, ProbeBucket>;

/// Analysed stats keyed by report name, then metric key.
pub type AnalysedMetrics = BTreeMap<String, BTreeMap<String, Stats>>;

/// Values from all runs of a scenario, keyed by probe name, then data key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombinedSeries(pub BTreeMap<String, BTreeMap<String, Vec<Value>>>);

impl CombinedSeries {
    /// Raw values for a probe key.
    pub fn values(&self, probe: &str, key: &str) -> Result<&[Value]> {
        self.0
            .get(probe)
            .and_then(|data| data.get(key))
            .map(Vec::as_slice)
            .ok_or_else(|| FresnelError::MissingSeries {
                probe: probe.to_string(),
                key: key.to_string(),
            })
    }

    /// Values for a probe key, all of which must be numbers.
    pub fn numbers(&self, probe: &str, key: &str) -> Result<Vec<f64>> {
        self.values(probe, key)?
            .iter()
            .map(|value| {
                value.as_f64().ok_or_else(|| FresnelError::MissingSeries {
                    probe: probe.to_string(),
                    key: key.to_string(),
                })
            })
            .collect()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Scenario settings frozen into the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOptions {
    pub url: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub reports: Vec<String>,
}

/// Everything recorded for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub options: ScenarioOptions,
    pub runs: Vec<RunData>,
    #[serde(default)]
    pub combined: CombinedSeries,
    #[serde(default)]
    pub analysed: AnalysedMetrics,
}

/// The output of one `record` invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Scenarios in configuration order.
    pub scenarios: IndexMap<String, ScenarioRecord>,
}

impl Record {
    /// Path of the record file for a label.
    pub fn path(output_dir: &Path, label: &str) -> PathBuf {
        output_dir.join(label).join(RECORD_FILE)
    }

    /// Read a record previously written by `record`.
    pub fn load(output_dir: &Path, label: &str) -> Result<Self> {
        let path = Self::path(output_dir, label);
        let content =
            std::fs::read_to_string(&path).map_err(|e| FresnelError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|source| FresnelError::Json { path, source })
    }

    /// Write the record as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|source| FresnelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, content).map_err(|e| FresnelError::io(path, e))
    }
}

/// Verdict for one compared metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Judgement {
    Improvement,
    Regression,
    Neutral,
}

impl From<Option<bool>> for Judgement {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Judgement::Improvement,
            Some(false) => Judgement::Regression,
            None => Judgement::Neutral,
        }
    }
}

impl From<Judgement> for Option<bool> {
    fn from(value: Judgement) -> Self {
        match value {
            Judgement::Improvement => Some(true),
            Judgement::Regression => Some(false),
            Judgement::Neutral => None,
        }
    }
}

impl fmt::Display for Judgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Judgement::Improvement => write!(f, "improvement"),
            Judgement::Regression => write!(f, "regression"),
            Judgement::Neutral => write!(f, "neutral"),
        }
    }
}

impl Judgement {
    /// Returns a one-character mark for tables.
    pub fn mark(&self) -> &'static str {
        match self {
            Judgement::Improvement => "✓",
            Judgement::Regression => "✘",
            Judgement::Neutral => "",
        }
    }
}

/// One metric compared across two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparedMetric {
    pub caption: String,
    pub unit: String,
    pub a: Stats,
    pub b: Stats,
    pub diff: f64,
    #[serde(rename = "compareUnit")]
    pub compare_unit: String,
    pub judgement: Judgement,
}

/// Compared metrics keyed by scenario (in record order), report, then metric key.
pub type ComparisonResult =
    IndexMap<String, BTreeMap<String, BTreeMap<String, ComparedMetric>>>;

/// A metric that regressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub scenario: String,
    pub report: String,
    pub metric: String,
    pub caption: String,
    pub diff: f64,
    #[serde(rename = "compareUnit")]
    pub compare_unit: String,
}

/// Outcome of comparing two records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub result: ComparisonResult,
    pub warnings: Vec<Warning>,
}

impl Comparison {
    /// Whether any metric regressed past its threshold.
    pub fn is_failing(&self) -> bool {
        !self.warnings.is_empty()
    }
}
