//! Screenshot of the viewport once the page has loaded.

use super::{AfterHook, Probe, ProbeData};
use crate::browser::Page;
use crate::writer::Writer;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

struct Screenshot;

#[async_trait]
impl AfterHook for Screenshot {
    async fn after(
        &self,
        page: &dyn Page,
        writer: &Writer,
        _data: &mut ProbeData,
    ) -> anyhow::Result<()> {
        let path = writer.get_path("image.png")?;
        debug!("Saving screenshot to {}", path.display());
        page.screenshot(&path).await
    }
}

pub fn probe() -> Probe {
    Probe::new().after(Arc::new(Screenshot))
}
