use serde_json::{Map, Value};

use crate::{Result, StoreError};

/// An atomic update applied to a single document.
///
/// Backends apply an update while holding exclusive access to the document,
/// so concurrent updates to the same document never lose each other's
/// effects. Array elements are addressed by their `"id"` field.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrites the listed top-level fields.
    Set(Map<String, Value>),

    /// Adds `by` to an integer field. When `min` is set, the update is
    /// rejected if the result would fall below it.
    Increment {
        field: String,
        by: i64,
        min: Option<i64>,
    },

    /// Appends a value to an array field.
    Push { array: String, value: Value },

    /// Sets one field of the array element whose `"id"` equals `element_id`.
    SetElementField {
        array: String,
        element_id: Value,
        field: String,
        value: Value,
    },

    /// Adds `by` to `field` of the first element whose `match_field` equals
    /// `match_value`; appends `element` when no element matches.
    IncrementElementOrPush {
        array: String,
        match_field: String,
        match_value: Value,
        field: String,
        by: i64,
        element: Value,
    },

    /// Removes the array element whose `"id"` equals `element_id`.
    RemoveElement { array: String, element_id: Value },

    /// Subtracts `by` from `field` of the element whose `"id"` equals
    /// `element_id`, removing the element once the field reaches zero. A
    /// missing element is left alone.
    DecrementElementOrRemove {
        array: String,
        element_id: Value,
        field: String,
        by: i64,
    },

    /// Rejects the update unless `field` currently equals `value`.
    Expect { field: String, value: Value },

    /// Applies several updates in order; all of them or none take effect.
    Many(Vec<Update>),
}

impl Update {
    /// Sets a single top-level field.
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.into(), value.into());
        Update::Set(fields)
    }

    /// Short name used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Update::Set(_) => "set",
            Update::Increment { .. } => "increment",
            Update::Push { .. } => "push",
            Update::SetElementField { .. } => "set_element_field",
            Update::IncrementElementOrPush { .. } => "increment_element_or_push",
            Update::RemoveElement { .. } => "remove_element",
            Update::DecrementElementOrRemove { .. } => "decrement_element_or_remove",
            Update::Expect { .. } => "expect",
            Update::Many(_) => "many",
        }
    }

    /// Applies the update to a document body in place.
    ///
    /// Backends apply updates to a copy of the stored body, so a failed
    /// update never reaches storage.
    pub fn apply(&self, body: &mut Value) -> Result<()> {
        let object = body
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidDocument("body is not an object".to_string()))?;
        self.apply_to(object)
    }

    fn apply_to(&self, object: &mut Map<String, Value>) -> Result<()> {
        match self {
            Update::Set(fields) => {
                for (field, value) in fields {
                    object.insert(field.clone(), value.clone());
                }
            }
            Update::Increment { field, by, min } => {
                let current = object.get(field).and_then(Value::as_i64).ok_or_else(|| {
                    StoreError::InvalidDocument(format!("{field} is not an integer"))
                })?;
                let next = current + by;
                if let Some(min) = min
                    && next < *min
                {
                    return Err(StoreError::ConditionFailed {
                        field: field.clone(),
                        reason: format!("{current} + {by} is below {min}"),
                    });
                }
                object.insert(field.clone(), Value::from(next));
            }
            Update::Push { array, value } => {
                array_mut(object, array)?.push(value.clone());
            }
            Update::SetElementField {
                array,
                element_id,
                field,
                value,
            } => {
                let element = array_mut(object, array)?
                    .iter_mut()
                    .find(|e| e.get("id") == Some(element_id))
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| element_not_found(array, element_id))?;
                element.insert(field.clone(), value.clone());
            }
            Update::IncrementElementOrPush {
                array,
                match_field,
                match_value,
                field,
                by,
                element,
            } => {
                let items = array_mut(object, array)?;
                match items
                    .iter_mut()
                    .find(|e| e.get(match_field) == Some(match_value))
                    .and_then(Value::as_object_mut)
                {
                    Some(existing) => {
                        let current = existing.get(field).and_then(Value::as_i64).ok_or_else(
                            || StoreError::InvalidDocument(format!("{field} is not an integer")),
                        )?;
                        existing.insert(field.clone(), Value::from(current + by));
                    }
                    None => items.push(element.clone()),
                }
            }
            Update::RemoveElement { array, element_id } => {
                let items = array_mut(object, array)?;
                let position = items
                    .iter()
                    .position(|e| e.get("id") == Some(element_id))
                    .ok_or_else(|| element_not_found(array, element_id))?;
                items.remove(position);
            }
            Update::DecrementElementOrRemove {
                array,
                element_id,
                field,
                by,
            } => {
                let items = array_mut(object, array)?;
                let Some(position) = items.iter().position(|e| e.get("id") == Some(element_id))
                else {
                    return Ok(());
                };
                let current = items[position]
                    .get(field)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        StoreError::InvalidDocument(format!("{field} is not an integer"))
                    })?;
                let next = current.saturating_sub(*by);
                if next <= 0 {
                    items.remove(position);
                } else if let Some(element) = items[position].as_object_mut() {
                    element.insert(field.clone(), Value::from(next));
                }
            }
            Update::Expect { field, value } => {
                let current = object.get(field).unwrap_or(&Value::Null);
                if current != value {
                    return Err(StoreError::ConditionFailed {
                        field: field.clone(),
                        reason: format!("expected {value}, found {current}"),
                    });
                }
            }
            Update::Many(updates) => {
                for update in updates {
                    update.apply_to(object)?;
                }
            }
        }

        Ok(())
    }
}

fn array_mut<'a>(object: &'a mut Map<String, Value>, array: &str) -> Result<&'a mut Vec<Value>> {
    object
        .entry(array.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| StoreError::InvalidDocument(format!("{array} is not an array")))
}

fn element_not_found(array: &str, element_id: &Value) -> StoreError {
    StoreError::ElementNotFound {
        array: array.to_string(),
        element: element_id.to_string(),
    }
}
