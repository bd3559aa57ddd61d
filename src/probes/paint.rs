//! Paint Timing entries, keyed by entry name
//! (`first-paint`, `first-contentful-paint`).
//!
//! See <https://www.w3.org/TR/paint-timing/>.

use super::{AfterHook, Probe, ProbeData};
use crate::browser::Page;
use crate::writer::Writer;
use async_trait::async_trait;
use std::sync::Arc;

const SCRIPT: &str = "(() => {
    const result = {};
    performance.getEntriesByType('paint').forEach((entry) => {
        result[entry.name] = entry.startTime;
    });
    return result;
})()";

struct Paint;

#[async_trait]
impl AfterHook for Paint {
    async fn after(
        &self,
        page: &dyn Page,
        _writer: &Writer,
        data: &mut ProbeData,
    ) -> anyhow::Result<()> {
        let entries = page.evaluate(SCRIPT).await?;
        data.add(entries)
    }
}

pub fn probe() -> Probe {
    Probe::new().after(Arc::new(Paint))
}
