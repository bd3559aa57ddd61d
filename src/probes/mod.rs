//! Probes capture raw measurements around a page load.
//!
//! A probe has up to two hooks. `before` runs after the viewport is set and
//! before navigation starts (start tracing, stub APIs, ...). `after` runs
//! once the page has loaded and reports data through [`ProbeData`].

pub mod navtiming;
pub mod paint;
pub mod screenshot;
pub mod trace;
pub mod transfer;

use crate::browser::Page;
use crate::error::{FresnelError, Result};
use crate::models::ProbeBucket;
use crate::registry::shape::{self, Shaped, TypeTag};
use crate::registry::{Capability, Registry};
use crate::writer::Writer;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait BeforeHook: Send + Sync {
    async fn before(&self, page: &dyn Page, writer: &Writer) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AfterHook: Send + Sync {
    async fn after(
        &self,
        page: &dyn Page,
        writer: &Writer,
        data: &mut ProbeData,
    ) -> anyhow::Result<()>;
}

/// The bucket a probe reports into during one run.
///
/// Every `add` merges into what was reported before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeData {
    values: ProbeBucket,
}

impl ProbeData {
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Merge every key of a JSON object.
    pub fn add(&mut self, data: Value) -> anyhow::Result<()> {
        match data {
            Value::Object(map) => {
                self.values.extend(map);
                Ok(())
            }
            other => anyhow::bail!("Probe data must be an object, got {}", TypeTag::of(&other)),
        }
    }

    pub fn into_inner(self) -> ProbeBucket {
        self.values
    }
}

/// A probe definition.
#[derive(Clone, Default)]
pub struct Probe {
    pub name: Option<String>,
    pub before: Option<Arc<dyn BeforeHook>>,
    pub after: Option<Arc<dyn AfterHook>>,
}

impl std::fmt::Debug for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn before(mut self, hook: Arc<dyn BeforeHook>) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn after(mut self, hook: Arc<dyn AfterHook>) -> Self {
        self.after = Some(hook);
        self
    }

    /// Name used for the run's data bucket and artifact prefix.
    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl Shaped for Probe {
    fn shape_view(&self) -> Option<BTreeMap<String, TypeTag>> {
        Some(BTreeMap::from([
            ("name".to_string(), TypeTag::optional(&self.name, TypeTag::String)),
            ("before".to_string(), TypeTag::optional(&self.before, TypeTag::Function)),
            ("after".to_string(), TypeTag::optional(&self.after, TypeTag::Function)),
        ]))
    }
}

impl Capability for Probe {
    const KIND: &'static str = "probe";

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn with_default_name(mut self, name: &str) -> Self {
        self.name.get_or_insert_with(|| name.to_string());
        self
    }

    fn validate(&self) -> Result<()> {
        shape::like(self, &shape::PROBE)?;
        if self.key().is_empty() {
            return Err(FresnelError::validation("probe", "Empty \"name\""));
        }
        Ok(())
    }
}

/// The built-in probes.
pub fn registry() -> Registry<Probe> {
    Registry::new()
        .with("navtiming", navtiming::probe())
        .with("paint", paint::probe())
        .with("screenshot", screenshot::probe())
        .with("trace", trace::probe())
        .with("transfer", transfer::probe())
}
