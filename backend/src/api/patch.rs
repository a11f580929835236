//! Partial-update payload assembly.
//!
//! Update bodies are tri-state per field: absent, explicit null, or an
//! explicit value. Most handlers keep only explicit non-falsy values —
//! empty strings, zeroes, and nulls are dropped from the patch alongside
//! absent fields. Deployed clients rely on that exact behaviour, so it is
//! pinned by the tests below rather than corrected.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Tri-state update field: `None` when absent from the body, `Some(None)`
/// for an explicit JSON null, `Some(Some(v))` for an explicit value.
pub(crate) type Field<T> = Option<Option<T>>;

/// Deserializer for [`Field`] members. A field that is present in the body
/// always maps to the `Some(..)` arm — `Some(None)` for an explicit null —
/// while `#[serde(default)]` keeps absent fields at `None`.
pub(crate) fn deserialize_field<'de, T, D>(deserializer: D) -> Result<Field<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accumulates the column assignments of one update statement.
#[derive(Debug, Default)]
pub(crate) struct PatchBuilder(Map<String, Value>);

impl PatchBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Keep an explicit, non-empty string.
    pub(crate) fn string(mut self, key: &str, field: &Field<String>) -> Self {
        if let Some(Some(value)) = field
            && !value.is_empty()
        {
            self.0.insert(key.to_owned(), Value::String(value.clone()));
        }
        self
    }

    /// Keep an explicit, non-zero float.
    pub(crate) fn number(mut self, key: &str, field: &Field<f64>) -> Self {
        if let Some(Some(value)) = field
            && *value != 0.0
        {
            self.0.insert(key.to_owned(), Value::from(*value));
        }
        self
    }

    /// Keep an explicit, non-zero integer.
    pub(crate) fn integer(mut self, key: &str, field: &Field<i64>) -> Self {
        if let Some(Some(value)) = field
            && *value != 0
        {
            self.0.insert(key.to_owned(), Value::from(*value));
        }
        self
    }

    /// Keep any explicit value, including empty strings and nulls. Used by
    /// handlers that never collapsed falsy values.
    pub(crate) fn passthrough(mut self, key: &str, field: &Field<Value>) -> Self {
        match field {
            None => {}
            Some(None) => {
                self.0.insert(key.to_owned(), Value::Null);
            }
            Some(Some(value)) => {
                self.0.insert(key.to_owned(), value.clone());
            }
        }
        self
    }

    /// Unconditionally assign a column (server-generated values such as
    /// `updated_at`).
    pub(crate) fn raw(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_owned(), value);
        self
    }

    pub(crate) fn build(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn absent_fields_stay_out_of_the_patch() {
        let patch = PatchBuilder::new().string("username", &None).build();
        assert_eq!(patch, json!({}));
    }

    #[test]
    fn explicit_values_are_kept() {
        let patch = PatchBuilder::new()
            .string("username", &Some(Some("ada".into())))
            .integer("difficulty", &Some(Some(3)))
            .number("y_min", &Some(Some(-2.5)))
            .build();
        assert_eq!(
            patch,
            json!({ "username": "ada", "difficulty": 3, "y_min": -2.5 })
        );
    }

    // Pins the drop-falsy contract: an explicit zero or empty string is NOT
    // applied, exactly like an absent field.
    #[rstest]
    #[case::zero_integer(PatchBuilder::new().integer("difficulty", &Some(Some(0))).build())]
    #[case::zero_float(PatchBuilder::new().number("y_min", &Some(Some(0.0))).build())]
    #[case::empty_string(PatchBuilder::new().string("result", &Some(Some(String::new()))).build())]
    #[case::explicit_null(PatchBuilder::new().string("result", &Some(None)).build())]
    fn falsy_values_are_dropped(#[case] patch: Value) {
        assert_eq!(patch, json!({}));
    }

    #[test]
    fn passthrough_keeps_empty_strings_and_nulls() {
        let patch = PatchBuilder::new()
            .passthrough("subject", &Some(Some(json!(""))))
            .passthrough("status", &Some(None))
            .passthrough("priority", &None)
            .build();
        assert_eq!(patch, json!({ "subject": "", "status": null }));
    }

    #[test]
    fn raw_assignments_always_apply() {
        let patch = PatchBuilder::new()
            .raw("updated_at", json!("2026-01-01T00:00:00Z"))
            .build();
        assert_eq!(patch, json!({ "updated_at": "2026-01-01T00:00:00Z" }));
    }
}
