//! Scenario orchestration.
//!
//! A recording resolves everything it needs up front, launches one browser,
//! performs every scenario's runs strictly in sequence and closes the
//! browser again before analysing the collected data.
//!
//! ```text
//! prepare  ->  launch  ->  [warmup] run 0 .. run N  (per scenario)  ->  close
//!          ->  combine + analyse  ->  <dir>/<label>/record.json
//! ```

#[cfg(test)]
pub mod testing;

use crate::analysis::{analyse, combine};
use crate::browser::{Browser, LaunchOptions, Launcher};
use crate::config::Config;
use crate::error::{FresnelError, HookPhase, Result};
use crate::models::{Record, RunData, ScenarioOptions, ScenarioRecord, Viewport, RECORD_FILE};
use crate::probes::{self, Probe, ProbeData};
use crate::registry::{CapabilityRef, Registry};
use crate::reports::{self, Report};
use crate::writer::Writer;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

const PLACEHOLDER: &str = r"\{([A-Z_]+)\}";

/// Progress notifications. They never influence the recording.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    RecordStart { scenarios: usize, runs: usize },
    Warmup { scenario: String },
    RecordRun { scenario: String, run: usize },
    Navigate { url: String },
    RecordEnd { label: String },
}

/// Replace `{VAR}` placeholders with values from `env`.
///
/// Unknown variables are left as they are.
pub fn expand_url(url: &str, env: &BTreeMap<String, String>) -> Result<String> {
    let pattern = Regex::new(PLACEHOLDER)
        .map_err(|e| FresnelError::validation("scenario.url", e.to_string()))?;

    let expanded = pattern.replace_all(url, |caps: &Captures| match env.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            warn!("No environment variable {} for {}", &caps[1], url);
            caps[0].to_string()
        }
    });
    Ok(expanded.into_owned())
}

/// A scenario with every name resolved, ready to run.
struct Prepared {
    key: String,
    url: String,
    viewport: Viewport,
    options: ScenarioOptions,
    probes: Vec<Probe>,
}

/// Records scenarios in a browser.
pub struct Recorder {
    launcher: Box<dyn Launcher>,
    launch_options: LaunchOptions,
    probes: Registry<Probe>,
    reports: Registry<Report>,
    env: BTreeMap<String, String>,
}

impl Recorder {
    /// A recorder using the built-in probes and reports.
    pub fn new(launcher: Box<dyn Launcher>) -> Self {
        Self {
            launcher,
            launch_options: LaunchOptions::default(),
            probes: probes::registry(),
            reports: reports::registry(),
            env: BTreeMap::new(),
        }
    }

    pub fn launch_options(mut self, options: LaunchOptions) -> Self {
        self.launch_options = options;
        self
    }

    /// Environment snapshot used for URL placeholders.
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    #[allow(dead_code)]
    pub fn probes(mut self, probes: Registry<Probe>) -> Self {
        self.probes = probes;
        self
    }

    #[allow(dead_code)]
    pub fn reports(mut self, reports: Registry<Report>) -> Self {
        self.reports = reports;
        self
    }

    /// Run every scenario and write `<output_dir>/<label>/record.json`.
    pub async fn record(
        &self,
        config: &Config,
        output_dir: &Path,
        label: &str,
        progress: &dyn Fn(&Progress),
    ) -> Result<Record> {
        // All lookups and validation happen before the browser starts.
        let writer = Writer::new(output_dir)?.child(label)?;
        let mut reports = self.reports.clone();
        let mut prepared = Vec::with_capacity(config.scenarios.len());
        for (key, scenario) in &config.scenarios {
            let mut resolved = Vec::new();
            for reference in &scenario.reports {
                let report = reports.get(reference)?;
                if matches!(reference, CapabilityRef::Inline(_)) {
                    reports = reports.with(report.key(), report.clone());
                }
                resolved.push(report);
            }

            let mut probes: Vec<Probe> = Vec::new();
            let names = resolved.iter().flat_map(|report| report.probes.iter());
            for probe in names
                .map(|name| self.probes.get_named(name))
                .chain(scenario.probes.iter().map(|r| self.probes.get(r)))
            {
                let probe = probe?;
                if !probes.iter().any(|p| p.key() == probe.key()) {
                    probes.push(probe);
                }
            }

            debug!(
                "Scenario {}: probes {:?}",
                key,
                probes.iter().map(Probe::key).collect::<Vec<_>>()
            );
            prepared.push(Prepared {
                key: key.clone(),
                url: expand_url(&scenario.url, &self.env)?,
                viewport: scenario.viewport,
                options: ScenarioOptions {
                    url: scenario.url.clone(),
                    viewport: scenario.viewport,
                    reports: resolved.iter().map(|r| r.key().to_string()).collect(),
                },
                probes,
            });
        }

        let mut browser = self
            .launcher
            .launch(&self.launch_options)
            .await
            .map_err(|source| FresnelError::Browser { source })?;

        progress(&Progress::RecordStart {
            scenarios: prepared.len(),
            runs: config.runs,
        });

        let outcome = self
            .run_scenarios(browser.as_ref(), config, &prepared, &writer, progress)
            .await;
        let closed = browser.close().await;
        let runs = match (outcome, closed) {
            (Ok(runs), Ok(())) => runs,
            (Ok(_), Err(source)) => return Err(FresnelError::Browser { source }),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close browser: {:#}", close_err);
                }
                return Err(e);
            }
        };

        let mut record = Record::default();
        for (scenario, runs) in prepared.into_iter().zip(runs) {
            let combined = combine(&runs);
            let analysed = analyse(&reports, &scenario.options.reports, &combined)?;
            record.scenarios.insert(
                scenario.key,
                ScenarioRecord {
                    options: scenario.options,
                    runs,
                    combined,
                    analysed,
                },
            );
        }

        let path = writer.get_path(RECORD_FILE)?;
        record.save(&path)?;
        info!("Record written to {}", path.display());

        progress(&Progress::RecordEnd {
            label: label.to_string(),
        });
        Ok(record)
    }

    async fn run_scenarios(
        &self,
        browser: &dyn Browser,
        config: &Config,
        prepared: &[Prepared],
        writer: &Writer,
        progress: &dyn Fn(&Progress),
    ) -> Result<Vec<Vec<RunData>>> {
        let mut all = Vec::with_capacity(prepared.len());

        for scenario in prepared {
            if config.warmup {
                progress(&Progress::Warmup {
                    scenario: scenario.key.clone(),
                });
                warmup(browser, scenario).await?;
            }

            let mut runs = Vec::with_capacity(config.runs);
            for run in 0..config.runs {
                progress(&Progress::RecordRun {
                    scenario: scenario.key.clone(),
                    run,
                });
                let run_writer = writer.child(&format!("scenario-{}-run-{}", scenario.key, run))?;
                runs.push(run_once(browser, scenario, &run_writer, progress).await?);
            }
            all.push(runs);
        }

        Ok(all)
    }
}

/// Load the page once in a throwaway session.
async fn warmup(browser: &dyn Browser, scenario: &Prepared) -> Result<()> {
    debug!("Warming up {}", scenario.url);
    let session = browser
        .new_session()
        .await
        .map_err(|source| FresnelError::Browser { source })?;

    let loaded = async {
        let page = session
            .new_page()
            .await
            .map_err(|source| FresnelError::Browser { source })?;
        page.set_viewport(scenario.viewport)
            .await
            .map_err(|source| FresnelError::Browser { source })?;
        page.goto(&scenario.url)
            .await
            .map_err(|source| FresnelError::Navigation {
                url: scenario.url.clone(),
                source,
            })
    }
    .await;

    finish_session(session.close().await, loaded)
}

/// One measured page load in a fresh session.
async fn run_once(
    browser: &dyn Browser,
    scenario: &Prepared,
    writer: &Writer,
    progress: &dyn Fn(&Progress),
) -> Result<RunData> {
    let session = browser
        .new_session()
        .await
        .map_err(|source| FresnelError::Browser { source })?;

    let collected = async {
        let page = session
            .new_page()
            .await
            .map_err(|source| FresnelError::Browser { source })?;
        page.set_viewport(scenario.viewport)
            .await
            .map_err(|source| FresnelError::Browser { source })?;

        for probe in &scenario.probes {
            if let Some(hook) = &probe.before {
                let probe_writer = writer.prefix(&format!("{}--", probe.key()))?;
                hook.before(page.as_ref(), &probe_writer)
                    .await
                    .map_err(|source| FresnelError::Probe {
                        probe: probe.key().to_string(),
                        phase: HookPhase::Before,
                        source,
                    })?;
            }
        }

        progress(&Progress::Navigate {
            url: scenario.url.clone(),
        });
        page.goto(&scenario.url)
            .await
            .map_err(|source| FresnelError::Navigation {
                url: scenario.url.clone(),
                source,
            })?;

        let mut run = RunData::new();
        for probe in &scenario.probes {
            let mut data = ProbeData::default();
            if let Some(hook) = &probe.after {
                let probe_writer = writer.prefix(&format!("{}--", probe.key()))?;
                hook.after(page.as_ref(), &probe_writer, &mut data)
                    .await
                    .map_err(|source| FresnelError::Probe {
                        probe: probe.key().to_string(),
                        phase: HookPhase::After,
                        source,
                    })?;
            }
            run.insert(probe.key().to_string(), data.into_inner());
        }
        Ok::<_, FresnelError>(run)
    }
    .await;

    finish_session(session.close().await, collected)
}

/// Combine a session close with the work done in it; the work's error wins.
fn finish_session<T>(closed: anyhow::Result<()>, outcome: Result<T>) -> Result<T> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(source)) => Err(FresnelError::Browser { source }),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!("Failed to close session: {:#}", close_err);
            }
            Err(e)
        }
    }
}
