//! In-memory browser and probes for orchestrator tests.

use crate::browser::{Browser, LaunchOptions, Launcher, Page, Session};
use crate::models::Viewport;
use crate::probes::{AfterHook, BeforeHook, Probe, ProbeData};
use crate::writer::Writer;
use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

const STORAGE_GET: &str = "localStorage.getItem('visited')";
const STORAGE_SET: &str = "localStorage.setItem('visited', '1')";

#[derive(Default)]
struct State {
    log: Vec<String>,
    results: VecDeque<Value>,
    failing_url: Option<String>,
}

/// A launcher whose browsers only record what is done to them.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigating to `url` fails.
    pub fn failing_url(self, url: &str) -> Self {
        self.state.lock().unwrap().failing_url = Some(url.to_string());
        self
    }

    /// Values returned by successive `evaluate` calls.
    pub fn push_results(&self, results: impl IntoIterator<Item = Value>) {
        self.state.lock().unwrap().results.extend(results);
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.log().iter().filter(|e| *e == event).count()
    }
}

fn record(state: &Mutex<State>, event: String) {
    state.lock().unwrap().log.push(event);
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn Browser>> {
        record(&self.state, "launch".to_string());
        Ok(Box::new(FakeBrowser {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeBrowser {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_session(&self) -> Result<Box<dyn Session>> {
        record(&self.state, "new_session".to_string());
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            storage: Arc::new(Mutex::new(BTreeMap::new())),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        record(&self.state, "close_browser".to_string());
        Ok(())
    }
}

struct FakeSession {
    state: Arc<Mutex<State>>,
    storage: Arc<Mutex<BTreeMap<String, String>>>,
}

#[async_trait]
impl Session for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            storage: Arc::clone(&self.storage),
        }))
    }

    async fn close(&self) -> Result<()> {
        record(&self.state, "close_session".to_string());
        Ok(())
    }
}

struct FakePage {
    state: Arc<Mutex<State>>,
    storage: Arc<Mutex<BTreeMap<String, String>>>,
}

#[async_trait]
impl Page for FakePage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        record(
            &self.state,
            format!("viewport {}x{}", viewport.width, viewport.height),
        );
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        record(&self.state, format!("goto {}", url));
        if self.state.lock().unwrap().failing_url.as_deref() == Some(url) {
            bail!("net::ERR_CONNECTION_REFUSED");
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        match script {
            STORAGE_GET => Ok(json!(self.storage.lock().unwrap().get("visited"))),
            STORAGE_SET => {
                self.storage
                    .lock()
                    .unwrap()
                    .insert("visited".to_string(), "1".to_string());
                Ok(Value::Null)
            }
            _ => Ok(self
                .state
                .lock()
                .unwrap()
                .results
                .pop_front()
                .unwrap_or_else(|| json!({}))),
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png")?;
        Ok(())
    }

    async fn start_tracing(&self) -> Result<()> {
        record(&self.state, "start_tracing".to_string());
        Ok(())
    }

    async fn stop_tracing(&self, path: &Path) -> Result<()> {
        record(&self.state, "stop_tracing".to_string());
        std::fs::write(path, json!({ "traceEvents": [] }).to_string())?;
        Ok(())
    }
}

/// Reports whatever the page evaluates to.
pub struct DataProbe;

impl DataProbe {
    pub fn probe() -> Probe {
        Probe::new().after(Arc::new(DataProbe))
    }
}

#[async_trait]
impl AfterHook for DataProbe {
    async fn after(&self, page: &dyn Page, _writer: &Writer, data: &mut ProbeData) -> Result<()> {
        let value = page.evaluate("data").await?;
        data.add(value)
    }
}

/// Reports whether the session had storage from an earlier page, then
/// leaves some behind.
pub struct StorageProbe;

impl StorageProbe {
    pub fn probe() -> Probe {
        Probe::new().after(Arc::new(StorageProbe))
    }
}

#[async_trait]
impl AfterHook for StorageProbe {
    async fn after(&self, page: &dyn Page, _writer: &Writer, data: &mut ProbeData) -> Result<()> {
        data.insert("seen", page.evaluate(STORAGE_GET).await?);
        page.evaluate(STORAGE_SET).await?;
        Ok(())
    }
}

/// Appends `<name>:before` and `<name>:after` to a shared list.
pub struct OrderProbe {
    name: String,
    order: Arc<Mutex<Vec<String>>>,
}

impl OrderProbe {
    pub fn probe(name: &str, order: &Arc<Mutex<Vec<String>>>) -> Probe {
        let hook = Arc::new(OrderProbe {
            name: name.to_string(),
            order: Arc::clone(order),
        });
        Probe::new().before(hook.clone()).after(hook)
    }
}

#[async_trait]
impl BeforeHook for OrderProbe {
    async fn before(&self, _page: &dyn Page, _writer: &Writer) -> Result<()> {
        self.order.lock().unwrap().push(format!("{}:before", self.name));
        Ok(())
    }
}

#[async_trait]
impl AfterHook for OrderProbe {
    async fn after(&self, _page: &dyn Page, _writer: &Writer, _data: &mut ProbeData) -> Result<()> {
        self.order.lock().unwrap().push(format!("{}:after", self.name));
        Ok(())
    }
}

/// Fails in its `after` hook.
pub struct FailingProbe;

impl FailingProbe {
    pub fn probe() -> Probe {
        Probe::new().after(Arc::new(FailingProbe))
    }
}

#[async_trait]
impl AfterHook for FailingProbe {
    async fn after(&self, _page: &dyn Page, _writer: &Writer, _data: &mut ProbeData) -> Result<()> {
        bail!("Probe exploded")
    }
}
