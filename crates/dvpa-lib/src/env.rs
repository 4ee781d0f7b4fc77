//! Evaluation environment for policy conditions
//!
//! Converts the three live objects of a pass into named JSON value trees so
//! conditions can reference arbitrary nested fields. Rebuilt on every pass,
//! never persisted.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::api::{DynamicVerticalPodAutoscaler, VerticalPodAutoscaler};

/// Binding names exposed to policy conditions
pub mod bindings {
    /// The target workload object, or `{}` if it does not exist.
    pub const TARGET: &str = "target";
    /// The existing VerticalPodAutoscaler child, or `{}` before creation.
    pub const VPA: &str = "vpa";
    /// The DynamicVerticalPodAutoscaler itself.
    pub const OBJ: &str = "obj";
}

/// Named set of value trees visible to conditions
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: BTreeMap<String, Value>,
}

impl Environment {
    /// Environment with no bindings (mostly useful in tests).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a binding.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Build the environment for one reconciliation pass. Objects that do
    /// not exist bind to an empty object rather than erroring, so conditions
    /// can probe for absence.
    pub fn build(
        obj: &DynamicVerticalPodAutoscaler,
        existing_vpa: Option<&VerticalPodAutoscaler>,
        target: Option<&Value>,
    ) -> Result<Self, serde_json::Error> {
        let vpa = match existing_vpa {
            Some(vpa) => serde_json::to_value(vpa)?,
            None => empty_object(),
        };
        Ok(Self::empty()
            .bind(bindings::TARGET, target.cloned().unwrap_or_else(empty_object))
            .bind(bindings::VPA, vpa)
            .bind(bindings::OBJ, serde_json::to_value(obj)?))
    }

    /// Resolve a top-level binding.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
