//! Scenario configuration.
//!
//! Configuration is read from `.fresnel.yml`, `.fresnel.yaml` or
//! `.fresnel.toml`. The document is parsed into a JSON value, defaults are
//! applied and the result is shape-checked before it becomes a [`Config`].

use crate::error::{FresnelError, Result};
use crate::models::Viewport;
use crate::probes::Probe;
use crate::registry::shape::{self, TypeTag};
use crate::registry::CapabilityRef;
use crate::reports::Report;
use anyhow::Context;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File names looked up in the working directory, in order.
pub const CONFIG_FILES: &[&str] = &[".fresnel.yml", ".fresnel.yaml", ".fresnel.toml"];

/// Runs per scenario when not configured.
pub const DEFAULT_RUNS: u64 = 1;

/// One page to measure.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Target URL. `{VAR}` placeholders are filled from the environment.
    pub url: String,
    pub viewport: Viewport,
    pub reports: Vec<CapabilityRef<Report>>,
    pub probes: Vec<CapabilityRef<Probe>>,
}

#[allow(dead_code)]
impl Scenario {
    pub fn new(url: &str, viewport: Viewport) -> Self {
        Self {
            url: url.to_string(),
            viewport,
            reports: Vec::new(),
            probes: Vec::new(),
        }
    }

    pub fn report(mut self, report: impl Into<CapabilityRef<Report>>) -> Self {
        self.reports.push(report.into());
        self
    }

    pub fn probe(mut self, probe: impl Into<CapabilityRef<Probe>>) -> Self {
        self.probes.push(probe.into());
        self
    }
}

/// Validated recording configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Load every scenario once, unrecorded, before its runs.
    pub warmup: bool,
    pub runs: usize,
    /// Scenarios in file order.
    pub scenarios: Vec<(String, Scenario)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warmup: false,
            runs: DEFAULT_RUNS as usize,
            scenarios: Vec::new(),
        }
    }
}

/// Syntax of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    /// Guess the format from the file extension. Anything but `.toml` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Yaml,
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content, Format::from_path(path))
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Find a configuration file in a directory.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Parse configuration text.
    pub fn parse(content: &str, format: Format) -> anyhow::Result<Self> {
        let document: Value = match format {
            Format::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML")?,
            Format::Toml => toml::from_str(content).context("Failed to parse TOML")?,
        };
        Ok(Self::from_value(document)?)
    }

    /// Apply defaults to a raw document, validate it, and convert it.
    pub fn from_value(document: Value) -> Result<Self> {
        let Value::Object(mut document) = document else {
            return Err(FresnelError::validation("config", "Non-object"));
        };
        document.entry("warmup").or_insert(Value::Bool(false));
        document.entry("runs").or_insert(Value::from(DEFAULT_RUNS));
        let document = Value::Object(document);
        shape::like(&document, &shape::CONFIG)?;

        let warmup = document["warmup"].as_bool().unwrap_or_default();
        let runs = document["runs"].as_u64().ok_or_else(|| {
            FresnelError::validation(
                "config",
                format!(
                    "Expected \"runs\" as a non-negative integer, got {}",
                    document["runs"]
                ),
            )
        })?;

        let scenarios = match &document["scenarios"] {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| Ok((key.clone(), parse_scenario(value)?)))
                .collect::<Result<Vec<_>>>()?,
            Value::Array(list) => list
                .iter()
                .enumerate()
                .map(|(index, value)| Ok((index.to_string(), parse_scenario(value)?)))
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            warmup,
            runs: runs as usize,
            scenarios,
        })
    }

    /// Starter configuration written by `fresnel init`.
    pub fn default_yaml() -> String {
        r#"# Fresnel scenarios.
# Placeholders like {HOST} in a url are filled from the environment.
warmup: true
runs: 5
scenarios:
  home:
    url: "http://localhost:8080/"
    viewport:
      width: 1200
      height: 800
    reports:
      - navtiming
      - paint
      - transfer
"#
        .to_string()
    }
}

fn parse_scenario(value: &Value) -> Result<Scenario> {
    shape::like(value, &shape::SCENARIO)?;
    let viewport = &value["viewport"];
    shape::like(viewport, &shape::VIEWPORT)?;

    Ok(Scenario {
        url: value["url"].as_str().unwrap_or_default().to_string(),
        viewport: Viewport {
            width: viewport["width"].as_f64().unwrap_or_default(),
            height: viewport["height"].as_f64().unwrap_or_default(),
        },
        reports: names(value, "reports")?
            .into_iter()
            .map(CapabilityRef::Named)
            .collect(),
        probes: names(value, "probes")?
            .into_iter()
            .map(CapabilityRef::Named)
            .collect(),
    })
}

/// Capability names listed under `key`. Definitions can't be written in a
/// file, so every entry must be a string.
fn names(scenario: &Value, key: &str) -> Result<Vec<String>> {
    let Some(list) = scenario.get(key).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    list.iter()
        .map(|entry| match entry {
            Value::String(name) => Ok(name.clone()),
            other => Err(FresnelError::validation(
                "scenario",
                format!(
                    "Expected \"{}\" entries as string, got {}",
                    key,
                    TypeTag::of(other)
                ),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_value(json!({ "scenarios": {} })).unwrap();
        assert!(!config.warmup);
        assert_eq!(config.runs, 1);
        assert!(config.scenarios.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
warmup: true
runs: 3
scenarios:
  zeta:
    url: "http://localhost/{SITE}/"
    viewport: { width: 800, height: 600 }
    reports: [navtiming]
  alpha:
    url: "http://localhost/other"
    viewport: { width: 320, height: 480 }
    probes: [screenshot]
"#;
        let config = Config::parse(yaml, Format::Yaml).unwrap();
        assert!(config.warmup);
        assert_eq!(config.runs, 3);

        let keys: Vec<&str> = config.scenarios.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let (_, zeta) = &config.scenarios[0];
        assert_eq!(zeta.url, "http://localhost/{SITE}/");
        assert_eq!(zeta.viewport.width, 800.0);
        assert_eq!(zeta.reports.len(), 1);
        assert_eq!(zeta.reports[0].label(), "navtiming");
        assert!(zeta.probes.is_empty());

        let (_, alpha) = &config.scenarios[1];
        assert_eq!(alpha.probes[0].label(), "screenshot");
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
runs = 2

[scenarios.home]
url = "http://localhost/"
reports = ["paint"]

[scenarios.home.viewport]
width = 1024
height = 768
"#;
        let config = Config::parse(toml_content, Format::Toml).unwrap();
        assert!(!config.warmup);
        assert_eq!(config.runs, 2);
        assert_eq!(config.scenarios[0].0, "home");
        assert_eq!(config.scenarios[0].1.viewport.height, 768.0);
    }

    #[test]
    fn test_scenario_list() {
        let config = Config::from_value(json!({
            "scenarios": [
                { "url": "http://a/", "viewport": { "width": 1, "height": 1 } },
                { "url": "http://b/", "viewport": { "width": 1, "height": 1 } }
            ]
        }))
        .unwrap();
        assert_eq!(config.scenarios[0].0, "0");
        assert_eq!(config.scenarios[1].1.url, "http://b/");
    }

    #[test]
    fn test_unexpected_key_rejected() {
        let err = Config::from_value(json!({ "scenarios": {}, "runz": 3 })).unwrap_err();
        assert_eq!(err.to_string(), "Validation of config: Unexpected key \"runz\"");
    }

    #[test]
    fn test_invalid_runs_rejected() {
        let err = Config::from_value(json!({ "scenarios": {}, "runs": "3" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation of config: Expected \"runs\" as number, got string"
        );

        let err = Config::from_value(json!({ "scenarios": {}, "runs": 1.5 })).unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
        assert!(Config::from_value(json!({ "scenarios": {}, "runs": -1 })).is_err());
    }

    #[test]
    fn test_invalid_scenario_rejected() {
        let err = Config::from_value(json!({
            "scenarios": { "home": { "url": "http://a/" } }
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation of scenario: Expected \"viewport\" as object, got undefined"
        );

        let err = Config::from_value(json!({
            "scenarios": { "home": { "url": "http://a/", "viewport": { "width": 1 } } }
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation of scenario.viewport: Expected \"height\" as number, got undefined"
        );

        let err = Config::from_value(json!({
            "scenarios": {
                "home": { "url": "http://a/", "viewport": { "width": 1, "height": 1 }, "reports": [{}] }
            }
        }))
        .unwrap_err();
        assert!(matches!(err, FresnelError::Validation { .. }));
    }

    #[test]
    fn test_missing_scenarios_rejected() {
        let err = Config::from_value(json!({ "runs": 1 })).unwrap_err();
        assert!(err.to_string().contains("\"scenarios\""));
        assert!(Config::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_default_yaml_is_valid() {
        let config = Config::parse(&Config::default_yaml(), Format::Yaml).unwrap();
        assert!(config.warmup);
        assert_eq!(config.scenarios.len(), 1);
        assert_eq!(config.scenarios[0].1.reports.len(), 3);
    }

    #[test]
    fn test_load_and_find() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::find(tmp.path()).is_none());

        let path = tmp.path().join(".fresnel.yml");
        std::fs::write(&path, Config::default_yaml()).unwrap();
        assert_eq!(Config::find(tmp.path()), Some(path.clone()));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.runs, 5);

        assert!(Config::load(&tmp.path().join("missing.yml")).is_err());
    }
}
