//! Resource Timing entries (including the document itself), stored as
//! `entries` for the transfer report.
//!
//! See <https://www.w3.org/TR/resource-timing-2/>.

use super::{AfterHook, Probe, ProbeData};
use crate::browser::Page;
use crate::writer::Writer;
use async_trait::async_trait;
use std::sync::Arc;

const SCRIPT: &str = "performance.getEntriesByType('resource')
    .concat(performance.getEntriesByType('navigation'))
    .map((entry) => entry.toJSON())";

struct Transfer;

#[async_trait]
impl AfterHook for Transfer {
    async fn after(
        &self,
        page: &dyn Page,
        _writer: &Writer,
        data: &mut ProbeData,
    ) -> anyhow::Result<()> {
        let entries = page.evaluate(SCRIPT).await?;
        data.insert("entries", entries);
        Ok(())
    }
}

pub fn probe() -> Probe {
    Probe::new().after(Arc::new(Transfer))
}
