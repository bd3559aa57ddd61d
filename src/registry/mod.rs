//! Named lookup of probes and reports.
//!
//! A registry holds a closed set of built-in definitions. Scenarios refer to
//! them by name, or hand over a literal definition; either way the result is
//! shape-checked before use.

pub mod shape;

use crate::error::{FresnelError, Result};
use shape::Shaped;
use std::collections::BTreeMap;
use tracing::debug;

/// A definition that can live in a [`Registry`].
pub trait Capability: Clone + Shaped {
    /// Used in lookup errors ("Unknown probe name").
    const KIND: &'static str;

    fn name(&self) -> Option<&str>;

    /// Give the definition a name if it doesn't carry one yet.
    fn with_default_name(self, name: &str) -> Self;

    /// Check the definition's shape.
    fn validate(&self) -> Result<()>;
}

/// Reference to a capability: by registered name, or a literal definition.
#[derive(Clone)]
pub enum CapabilityRef<T> {
    Named(String),
    Inline(T),
}

impl<T: Capability> CapabilityRef<T> {
    /// The name this reference is recorded under.
    pub fn label(&self) -> String {
        match self {
            CapabilityRef::Named(name) => name.clone(),
            CapabilityRef::Inline(value) => value.name().unwrap_or_default().to_string(),
        }
    }
}

impl<T> From<&str> for CapabilityRef<T> {
    fn from(name: &str) -> Self {
        CapabilityRef::Named(name.to_string())
    }
}

impl<T> std::fmt::Debug for CapabilityRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityRef::Named(name) => write!(f, "Named({:?})", name),
            CapabilityRef::Inline(_) => write!(f, "Inline(..)"),
        }
    }
}

/// Closed mapping of names to definitions.
#[derive(Clone)]
pub struct Registry<T> {
    values: BTreeMap<String, T>,
}

impl<T: Capability> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Capability> Registry<T> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Register a definition under a name.
    pub fn with(mut self, name: &str, value: T) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Registered names, sorted.
    #[allow(dead_code)]
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Resolve a reference to a validated definition.
    pub fn get(&self, reference: &CapabilityRef<T>) -> Result<T> {
        let value = match reference {
            CapabilityRef::Named(name) => {
                let stored = self.values.get(name).ok_or_else(|| FresnelError::Lookup {
                    kind: T::KIND,
                    name: name.clone(),
                })?;
                stored.clone().with_default_name(name)
            }
            CapabilityRef::Inline(value) => value.clone(),
        };

        value.validate()?;
        debug!("Resolved {} {:?}", T::KIND, value.name().unwrap_or_default());
        Ok(value)
    }

    /// Resolve a registered name.
    pub fn get_named(&self, name: &str) -> Result<T> {
        self.get(&CapabilityRef::Named(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Page;
    use crate::probes::{AfterHook, Probe, ProbeData};
    use crate::writer::Writer;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl AfterHook for Noop {
        async fn after(
            &self,
            _page: &dyn Page,
            _writer: &Writer,
            _data: &mut ProbeData,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry() -> Registry<Probe> {
        Registry::new()
            .with("foo", Probe::new().after(Arc::new(Noop)))
            .with("bar", Probe::new())
    }

    #[test]
    fn test_unknown_name() {
        let err = registry().get_named("quux").unwrap_err();
        assert!(matches!(
            err,
            FresnelError::Lookup { kind: "probe", ref name } if name == "quux"
        ));
        assert_eq!(err.to_string(), "Unknown probe name: quux");
    }

    #[test]
    fn test_name_filled_from_key() {
        let probe = registry().get_named("foo").unwrap();
        assert_eq!(probe.name(), Some("foo"));
        assert!(probe.after.is_some());
        assert!(probe.before.is_none());
    }

    #[test]
    fn test_inline_definition() {
        let inline = Probe::new().named("adhoc").after(Arc::new(Noop));
        let probe = registry().get(&CapabilityRef::Inline(inline)).unwrap();
        assert_eq!(probe.name(), Some("adhoc"));
    }

    #[test]
    fn test_inline_without_name_is_rejected() {
        let err = registry()
            .get(&CapabilityRef::Inline(Probe::new()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation of probe: Expected \"name\" as string, got undefined"
        );
    }

    #[test]
    fn test_names_sorted() {
        assert_eq!(registry().names(), vec!["bar", "foo"]);
    }
}
