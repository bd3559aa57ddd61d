//! Closed-world validation of object shapes.
//!
//! A [`Shape`] lists every key an object may have and the type tags each
//! key accepts. Anything not listed is rejected. The same check runs over
//! raw configuration documents and over probe/report definitions, which
//! expose their fields through [`Shaped`].

use crate::error::{FresnelError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Type of a value as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Function,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Function => "function",
        };
        f.write_str(name)
    }
}

impl TypeTag {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// Tag for an optional slot: `present` when set, `undefined` otherwise.
    pub fn optional<T>(slot: &Option<T>, present: TypeTag) -> Self {
        if slot.is_some() {
            present
        } else {
            TypeTag::Undefined
        }
    }
}

/// One declared key and the tags it accepts.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub accepts: &'static [TypeTag],
}

/// A named, closed set of fields.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub subject: &'static str,
    pub fields: &'static [Field],
}

const fn field(key: &'static str, accepts: &'static [TypeTag]) -> Field {
    Field { key, accepts }
}

use TypeTag::{Array, Boolean, Function, Number, Object, String as Str, Undefined};

pub const PROBE: Shape = Shape {
    subject: "probe",
    fields: &[
        field("before", &[Function, Undefined]),
        field("after", &[Function, Undefined]),
        field("name", &[Str]),
    ],
};

pub const REPORT: Shape = Shape {
    subject: "report",
    fields: &[
        field("probes", &[Array]),
        field("metrics", &[Object]),
        field("name", &[Str]),
    ],
};

pub const METRIC: Shape = Shape {
    subject: "report#metric",
    fields: &[
        field("caption", &[Str]),
        field("unit", &[Str]),
        field("analyse", &[Function]),
        field("compare", &[Function]),
        field("threshold", &[Number, Undefined]),
        field("compareUnit", &[Str, Undefined]),
    ],
};

pub const CONFIG: Shape = Shape {
    subject: "config",
    fields: &[
        field("warmup", &[Boolean]),
        field("runs", &[Number]),
        field("scenarios", &[Object, Array]),
    ],
};

pub const SCENARIO: Shape = Shape {
    subject: "scenario",
    fields: &[
        field("url", &[Str]),
        field("viewport", &[Object]),
        field("reports", &[Array, Undefined]),
        field("probes", &[Array, Undefined]),
    ],
};

pub const VIEWPORT: Shape = Shape {
    subject: "scenario.viewport",
    fields: &[field("height", &[Number]), field("width", &[Number])],
};

/// Something the validator can look at as a key/value mapping.
pub trait Shaped {
    /// The fields and their tags, or `None` when this is not a plain mapping.
    fn shape_view(&self) -> Option<BTreeMap<String, TypeTag>>;
}

impl Shaped for Value {
    fn shape_view(&self) -> Option<BTreeMap<String, TypeTag>> {
        match self {
            Value::Object(map) => Some(
                map.iter()
                    .map(|(key, value)| (key.clone(), TypeTag::of(value)))
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn join_tags(tags: &[TypeTag]) -> String {
    tags.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Check a value against a shape.
pub fn like(value: &impl Shaped, shape: &Shape) -> Result<()> {
    let view = value
        .shape_view()
        .ok_or_else(|| FresnelError::validation(shape.subject, "Non-object"))?;

    for field in shape.fields {
        let actual = view.get(field.key).copied().unwrap_or(TypeTag::Undefined);
        if !field.accepts.contains(&actual) {
            return Err(FresnelError::validation(
                shape.subject,
                format!(
                    "Expected \"{}\" as {}, got {}",
                    field.key,
                    join_tags(field.accepts),
                    actual
                ),
            ));
        }
    }

    if let Some(key) = view
        .keys()
        .find(|key| !shape.fields.iter().any(|f| f.key == key.as_str()))
    {
        return Err(FresnelError::validation(
            shape.subject,
            format!("Unexpected key \"{}\"", key),
        ));
    }

    Ok(())
}
