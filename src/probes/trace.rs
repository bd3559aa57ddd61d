//! Performance trace of the page load, saved as `trace.json`.
//!
//! The file opens in the Performance panel of Chrome DevTools.

use super::{AfterHook, BeforeHook, Probe, ProbeData};
use crate::browser::Page;
use crate::writer::Writer;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

struct Trace;

#[async_trait]
impl BeforeHook for Trace {
    async fn before(&self, page: &dyn Page, _writer: &Writer) -> anyhow::Result<()> {
        page.start_tracing().await
    }
}

#[async_trait]
impl AfterHook for Trace {
    async fn after(
        &self,
        page: &dyn Page,
        writer: &Writer,
        _data: &mut ProbeData,
    ) -> anyhow::Result<()> {
        let path = writer.get_path("trace.json")?;
        debug!("Saving trace to {}", path.display());
        page.stop_tracing(&path).await
    }
}

pub fn probe() -> Probe {
    let hook = Arc::new(Trace);
    Probe::new().before(hook.clone()).after(hook)
}
