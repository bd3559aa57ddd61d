//! Navigation Timing entry of the loaded document.
//!
//! See <https://www.w3.org/TR/navigation-timing-2/>.

use super::{AfterHook, Probe, ProbeData};
use crate::browser::Page;
use crate::writer::Writer;
use async_trait::async_trait;
use std::sync::Arc;

const SCRIPT: &str = "performance.getEntriesByType('navigation')[0].toJSON()";

struct NavTiming;

#[async_trait]
impl AfterHook for NavTiming {
    async fn after(
        &self,
        page: &dyn Page,
        _writer: &Writer,
        data: &mut ProbeData,
    ) -> anyhow::Result<()> {
        let timing = page.evaluate(SCRIPT).await?;
        data.add(timing)
    }
}

pub fn probe() -> Probe {
    Probe::new().after(Arc::new(NavTiming))
}
