//! Boundary types for composite resource edit forms: the edit-session
//! composite, its operation mode, and the capability trait every
//! participating field implements.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Create vs. update flag on a composite. Read-only to fields; controls
/// validation strictness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
}

/// Aggregate edit-session object for one resource. Holds the merged field
/// payloads from all participating widgets, keyed by dotted path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composite {
    pub operation: Operation,
    data: Value,
}

impl Composite {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            data: Value::Object(Map::new()),
        }
    }

    /// Write `value` at a dotted path, creating intermediate objects on the
    /// way. A non-object intermediate is replaced by an object.
    pub fn set_path(&mut self, path: &str, value: Value) {
        fn slot<'a>(v: &'a mut Value, key: &str) -> &'a mut Value {
            if !v.is_object() {
                *v = Value::Object(Map::new());
            }
            v.as_object_mut()
                .expect("ensured object above")
                .entry(key.to_string())
                .or_insert(Value::Null)
        }
        let mut cur = &mut self.data;
        for part in path.split('.') {
            cur = slot(cur, part);
        }
        *cur = value;
    }

    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut cur = &self.data;
        for part in path.split('.') {
            cur = cur.as_object()?.get(part)?;
        }
        Some(cur)
    }

    /// The outgoing payload body as assembled so far.
    pub fn payload(&self) -> &Value {
        &self.data
    }

    pub fn into_payload(self) -> Value {
        self.data
    }
}

/// Hard failures a field can surface to the host. Validation failures are
/// not errors; they are the `false` arm of [`FormField::validate`].
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("template: {0}")]
    Template(String),
}

pub type FieldResult<T> = Result<T, FieldError>;

/// Capability set of a single form field within a composite edit form.
///
/// The host calls `validate` on every field and, only when all fields
/// accept, `serialize_into` on every field for the same submission attempt.
/// `serialize_into` may therefore assume the invariants `validate` checked.
pub trait FormField {
    /// Display label for the field's pane.
    fn title(&self) -> &str;

    /// Markup for the field's template region.
    fn render(&self) -> FieldResult<String>;

    /// Readiness gate for a submission attempt. No side effects visible to
    /// the host; must not mutate the composite.
    fn validate(&self, composite: &Composite) -> bool;

    /// Merge this field's payload into the outgoing composite. Infallible;
    /// readiness was already checked by `validate`.
    fn serialize_into(&self, composite: &mut Composite);
}

/// Two-phase submit for an in-process host: every field validates before any
/// field serializes. Returns false, leaving the composite untouched, as soon
/// as one field rejects.
pub fn submit(fields: &[&dyn FormField], composite: &mut Composite) -> bool {
    for field in fields {
        if !field.validate(composite) {
            debug!(field = field.title(), "submit blocked by field validation");
            return false;
        }
    }
    for field in fields {
        field.serialize_into(composite);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn set_path_creates_intermediate_objects() {
        let mut c = Composite::new(Operation::Create);
        c.set_path("a.b.c", json!(1));
        assert_eq!(c.payload(), &json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn set_path_overwrites_leaf() {
        let mut c = Composite::new(Operation::Update);
        c.set_path("a.b", json!("old"));
        c.set_path("a.b", json!("new"));
        assert_eq!(c.get_path("a.b"), Some(&json!("new")));
    }

    #[test]
    fn set_path_replaces_scalar_intermediate() {
        let mut c = Composite::new(Operation::Update);
        c.set_path("a", json!(42));
        c.set_path("a.b", json!(true));
        assert_eq!(c.payload(), &json!({"a": {"b": true}}));
    }

    #[test]
    fn get_path_missing_is_none() {
        let c = Composite::new(Operation::Create);
        assert_eq!(c.get_path("nope.nothing"), None);
    }

    struct ProbeField {
        accept: bool,
        validated: Cell<usize>,
        serialized: Cell<usize>,
    }

    impl ProbeField {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                validated: Cell::new(0),
                serialized: Cell::new(0),
            }
        }
    }

    impl FormField for ProbeField {
        fn title(&self) -> &str {
            "probe"
        }
        fn render(&self) -> FieldResult<String> {
            Ok(String::new())
        }
        fn validate(&self, _composite: &Composite) -> bool {
            self.validated.set(self.validated.get() + 1);
            self.accept
        }
        fn serialize_into(&self, composite: &mut Composite) {
            self.serialized.set(self.serialized.get() + 1);
            composite.set_path("probe.touched", json!(true));
        }
    }

    #[test]
    fn submit_serializes_only_after_all_fields_validate() {
        let a = ProbeField::new(true);
        let b = ProbeField::new(true);
        let mut c = Composite::new(Operation::Create);
        assert!(submit(&[&a, &b], &mut c));
        assert_eq!(a.validated.get(), 1);
        assert_eq!(b.validated.get(), 1);
        assert_eq!(a.serialized.get(), 1);
        assert_eq!(b.serialized.get(), 1);
    }

    #[test]
    fn submit_blocks_when_any_field_rejects() {
        let a = ProbeField::new(true);
        let b = ProbeField::new(false);
        let mut c = Composite::new(Operation::Create);
        assert!(!submit(&[&a, &b], &mut c));
        assert_eq!(a.serialized.get(), 0);
        assert_eq!(b.serialized.get(), 0);
        assert_eq!(c.payload(), &json!({}));
    }
}
