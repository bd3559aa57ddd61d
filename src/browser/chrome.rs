//! Headless Chromium provider.
//!
//! Drives Chromium through the DevTools protocol. Every session is a fresh
//! browser context, disposed when the session closes, so runs never share
//! cookies, storage or HTTP cache. DevTools calls block, so they run on
//! tokio's blocking pool.

use super::{Browser, LaunchOptions, Launcher, Page, Session};
use crate::models::Viewport;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::protocol::cdp::{Emulation, Target, Tracing};
use headless_chrome::Tab;
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Trace categories recorded by default in DevTools performance traces.
const TRACE_CATEGORIES: &[&str] = &[
    "-*",
    "devtools.timeline",
    "v8.execute",
    "disabled-by-default-devtools.timeline",
    "disabled-by-default-devtools.timeline.frame",
    "toplevel",
    "blink.console",
    "blink.user_timing",
    "latencyInfo",
    "disabled-by-default-devtools.timeline.stack",
    "disabled-by-default-v8.cpu_profiler",
];

const TRACE_TIMEOUT: Duration = Duration::from_secs(30);

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Page viewport override, as a desktop page at 1x scale.
fn device_metrics(viewport: Viewport) -> Emulation::SetDeviceMetricsOverride {
    Emulation::SetDeviceMetricsOverride {
        width: viewport.width.round() as u32,
        height: viewport.height.round() as u32,
        device_scale_factor: 1.0,
        mobile: false,
        scale: None,
        screen_width: None,
        screen_height: None,
        position_x: None,
        position_y: None,
        dont_set_visible_size: None,
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    }
}

fn dispose_context(context_id: &str) -> Target::DisposeBrowserContext {
    Target::DisposeBrowserContext {
        browser_context_id: context_id.to_string(),
    }
}

/// Launches a local headless Chromium.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>> {
        let args = options.args.clone();
        info!("Launching headless Chromium");
        if !args.is_empty() {
            debug!("Chromium flags: {:?}", args);
        }

        let browser = blocking(move || {
            let flags: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
            let launch_options = headless_chrome::LaunchOptions::default_builder()
                .headless(true)
                .args(flags)
                .build()
                .map_err(|e| anyhow!("Invalid Chromium launch options: {}", e))?;
            headless_chrome::Browser::new(launch_options).context("Failed to launch Chromium")
        })
        .await?;

        Ok(Box::new(ChromeBrowser {
            browser: Some(Arc::new(browser)),
        }))
    }
}

struct ChromeBrowser {
    browser: Option<Arc<headless_chrome::Browser>>,
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_session(&self) -> Result<Box<dyn Session>> {
        let browser = self
            .browser
            .clone()
            .ok_or_else(|| anyhow!("Browser is already closed"))?;

        let owner = Arc::clone(&browser);
        let (context_id, tab) = blocking(move || {
            let context = owner.new_context()?;
            let tab = context.new_tab()?;
            Ok((context.get_id().to_string(), tab))
        })
        .await?;
        debug!("Opened browser context {}", context_id);

        Ok(Box::new(ChromeSession {
            browser,
            context_id,
            tab,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if self.browser.take().is_some() {
            debug!("Chromium closed");
        }
        Ok(())
    }
}

struct ChromeSession {
    browser: Arc<headless_chrome::Browser>,
    context_id: String,
    tab: Arc<Tab>,
}

#[async_trait]
impl Session for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        Ok(Box::new(ChromePage {
            tab: Arc::clone(&self.tab),
            trace: Arc::new(Mutex::new(TraceBuffer::default())),
        }))
    }

    async fn close(&self) -> Result<()> {
        let browser = Arc::clone(&self.browser);
        let tab = Arc::clone(&self.tab);
        let context_id = self.context_id.clone();
        blocking(move || {
            tab.close(true)?;
            browser
                .call_method(dispose_context(&context_id))
                .with_context(|| format!("Failed to dispose browser context {}", context_id))?;
            Ok(())
        })
        .await
    }
}

/// Trace events streamed by `Tracing.dataCollected`.
#[derive(Default)]
struct TraceBuffer {
    events: Vec<Value>,
    complete: bool,
}

struct ChromePage {
    tab: Arc<Tab>,
    trace: Arc<Mutex<TraceBuffer>>,
}

#[async_trait]
impl Page for ChromePage {
    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.call_method(device_metrics(viewport))?;
            Ok(())
        })
        .await
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        blocking(move || {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let tab = Arc::clone(&self.tab);
        // Objects only come back by value when serialised in the page.
        let expression = format!("JSON.stringify({})", script);
        blocking(move || {
            let result = tab.evaluate(&expression, true)?;
            match result.value {
                Some(Value::String(json)) => {
                    serde_json::from_str(&json).context("Page returned malformed JSON")
                }
                _ => Ok(Value::Null),
            }
        })
        .await
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let path: PathBuf = path.to_path_buf();
        blocking(move || {
            let png = tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)?;
            std::fs::write(&path, png)
                .with_context(|| format!("Failed to write screenshot to {}", path.display()))
        })
        .await
    }

    async fn start_tracing(&self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let trace = Arc::clone(&self.trace);
        blocking(move || {
            *trace.lock().map_err(|_| anyhow!("Trace buffer poisoned"))? = TraceBuffer::default();

            let sink = Arc::clone(&trace);
            tab.add_event_listener(Arc::new(move |event: &Event| {
                let Ok(mut buffer) = sink.lock() else {
                    return;
                };
                match event {
                    Event::TracingDataCollected(collected) => {
                        buffer.events.extend(collected.params.value.iter().cloned());
                    }
                    Event::TracingComplete(_) => buffer.complete = true,
                    _ => {}
                }
            }))?;

            tab.call_method(Tracing::Start {
                categories: Some(TRACE_CATEGORIES.join(",")),
                options: None,
                buffer_usage_reporting_interval: None,
                transfer_mode: None,
                stream_format: None,
                stream_compression: None,
                trace_config: None,
                perfetto_config: None,
                tracing_backend: None,
            })?;
            Ok(())
        })
        .await
    }

    async fn stop_tracing(&self, path: &Path) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let trace = Arc::clone(&self.trace);
        let path: PathBuf = path.to_path_buf();
        blocking(move || {
            tab.call_method(Tracing::End(None))?;

            let deadline = Instant::now() + TRACE_TIMEOUT;
            let events = loop {
                {
                    let mut buffer = trace.lock().map_err(|_| anyhow!("Trace buffer poisoned"))?;
                    if buffer.complete {
                        break std::mem::take(&mut buffer.events);
                    }
                }
                if Instant::now() > deadline {
                    bail!("Timed out waiting for the trace to complete");
                }
                std::thread::sleep(Duration::from_millis(50));
            };

            debug!("Writing {} trace events to {}", events.len(), path.display());
            let content = serde_json::to_string(&json!({ "traceEvents": events }))?;
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write trace to {}", path.display()))
        })
        .await
    }
}
