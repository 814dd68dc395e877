//! JSON shape validation for request and response bodies.
//!
//! A [`Shape`] describes the structure a JSON body must have. Endpoint
//! contracts carry an optional request shape and an optional response shape;
//! the service client checks bodies against them before sending and after
//! receiving.
//!
//! # Example
//!
//! ```
//! use meridian_core::Shape;
//!
//! let customer = Shape::object([
//!     ("id", Shape::string().required()),
//!     ("name", Shape::string().min_length(1).required()),
//!     ("age", Shape::integer().minimum(0)),
//! ]);
//!
//! assert!(customer.validate(&serde_json::json!({"id": "123", "name": "John"})).is_ok());
//! assert!(customer.validate(&serde_json::json!({"id": "123"})).is_err());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A structural description of a JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(flatten)]
    kind: ShapeKind,
    /// Whether `null` or absence is rejected.
    #[serde(default)]
    required: bool,
}

/// The type-specific part of a [`Shape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    /// A JSON string.
    String {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Allowed values; empty means any.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        one_of: Vec<String>,
    },
    /// A JSON number without a fractional part.
    Integer {
        /// Inclusive lower bound.
        minimum: Option<i64>,
        /// Inclusive upper bound.
        maximum: Option<i64>,
    },
    /// Any JSON number.
    Number {
        /// Inclusive lower bound.
        minimum: Option<f64>,
        /// Inclusive upper bound.
        maximum: Option<f64>,
    },
    /// A JSON boolean.
    Boolean,
    /// A JSON array.
    Array {
        /// Shape of every item.
        items: Box<Shape>,
        /// Minimum number of items.
        min_items: Option<usize>,
        /// Maximum number of items.
        max_items: Option<usize>,
    },
    /// A JSON object.
    Object {
        /// Known properties, in declaration order.
        properties: IndexMap<String, Shape>,
        /// Reject properties not listed in `properties`.
        #[serde(default)]
        deny_unknown: bool,
    },
    /// Accepts any value.
    Any,
    /// Accepts only `null`.
    Null,
}

/// A shape violation at a JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error at '{path}': {message}")]
pub struct ShapeError {
    /// `$`-rooted JSON path of the offending value.
    pub path: String,
    /// What was wrong.
    pub message: String,
}

impl ShapeError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl Shape {
    const fn of(kind: ShapeKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }

    /// A string shape.
    #[must_use]
    pub const fn string() -> Self {
        Self::of(ShapeKind::String {
            min_length: None,
            max_length: None,
            one_of: Vec::new(),
        })
    }

    /// An integer shape.
    #[must_use]
    pub const fn integer() -> Self {
        Self::of(ShapeKind::Integer {
            minimum: None,
            maximum: None,
        })
    }

    /// A number shape.
    #[must_use]
    pub const fn number() -> Self {
        Self::of(ShapeKind::Number {
            minimum: None,
            maximum: None,
        })
    }

    /// A boolean shape.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::of(ShapeKind::Boolean)
    }

    /// An array shape whose items all match `items`.
    #[must_use]
    pub fn array(items: Shape) -> Self {
        Self::of(ShapeKind::Array {
            items: Box::new(items),
            min_items: None,
            max_items: None,
        })
    }

    /// An object shape built from `(name, shape)` pairs.
    ///
    /// Properties whose shape is [`required`](Self::required) must be present.
    #[must_use]
    pub fn object<'a>(properties: impl IntoIterator<Item = (&'a str, Shape)>) -> Self {
        Self::of(ShapeKind::Object {
            properties: properties
                .into_iter()
                .map(|(name, shape)| (name.to_string(), shape))
                .collect(),
            deny_unknown: false,
        })
    }

    /// A shape that accepts anything.
    #[must_use]
    pub const fn any() -> Self {
        Self::of(ShapeKind::Any)
    }

    /// A shape that accepts only `null`.
    #[must_use]
    pub const fn null() -> Self {
        Self::of(ShapeKind::Null)
    }

    /// Marks this shape as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns whether this shape rejects `null` or absence.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the type-specific part of this shape.
    #[must_use]
    pub const fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Sets the minimum length of a string shape.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let ShapeKind::String { min_length, .. } = &mut self.kind {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length of a string shape.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let ShapeKind::String { max_length, .. } = &mut self.kind {
            *max_length = Some(len);
        }
        self
    }

    /// Restricts a string shape to the given values.
    #[must_use]
    pub fn one_of<'a>(mut self, values: impl IntoIterator<Item = &'a str>) -> Self {
        if let ShapeKind::String { one_of, .. } = &mut self.kind {
            *one_of = values.into_iter().map(str::to_string).collect();
        }
        self
    }

    /// Sets the inclusive lower bound of an integer or number shape.
    #[must_use]
    pub fn minimum(mut self, min: i64) -> Self {
        match &mut self.kind {
            ShapeKind::Integer { minimum, .. } => *minimum = Some(min),
            ShapeKind::Number { minimum, .. } => *minimum = Some(min as f64),
            _ => {}
        }
        self
    }

    /// Sets the inclusive upper bound of an integer or number shape.
    #[must_use]
    pub fn maximum(mut self, max: i64) -> Self {
        match &mut self.kind {
            ShapeKind::Integer { maximum, .. } => *maximum = Some(max),
            ShapeKind::Number { maximum, .. } => *maximum = Some(max as f64),
            _ => {}
        }
        self
    }

    /// Sets the minimum item count of an array shape.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let ShapeKind::Array { min_items, .. } = &mut self.kind {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum item count of an array shape.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let ShapeKind::Array { max_items, .. } = &mut self.kind {
            *max_items = Some(max);
        }
        self
    }

    /// Makes an object shape reject properties it does not declare.
    #[must_use]
    pub fn deny_unknown(mut self) -> Self {
        if let ShapeKind::Object { deny_unknown, .. } = &mut self.kind {
            *deny_unknown = true;
        }
        self
    }

    /// Validates a JSON value against this shape.
    ///
    /// Stops at the first violation.
    pub fn validate(&self, value: &Value) -> Result<(), ShapeError> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), ShapeError> {
        if value.is_null() && !matches!(self.kind, ShapeKind::Null) {
            return if self.required {
                Err(ShapeError::new(path, "required value is null"))
            } else {
                Ok(())
            };
        }

        match &self.kind {
            ShapeKind::String {
                min_length,
                max_length,
                one_of,
            } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_mismatch(path, "string", value))?;
                let len = s.chars().count();
                if let Some(min) = min_length.filter(|min| len < *min) {
                    return Err(ShapeError::new(
                        path,
                        format!("string length {len} is less than minimum {min}"),
                    ));
                }
                if let Some(max) = max_length.filter(|max| len > *max) {
                    return Err(ShapeError::new(
                        path,
                        format!("string length {len} is greater than maximum {max}"),
                    ));
                }
                if !one_of.is_empty() && !one_of.iter().any(|allowed| allowed == s) {
                    return Err(ShapeError::new(
                        path,
                        format!("'{s}' is not one of [{}]", one_of.join(", ")),
                    ));
                }
                Ok(())
            }

            ShapeKind::Integer { minimum, maximum } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| type_mismatch(path, "integer", value))?;
                check_range(path, n, *minimum, *maximum)
            }

            ShapeKind::Number { minimum, maximum } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| type_mismatch(path, "number", value))?;
                check_range(path, n, *minimum, *maximum)
            }

            ShapeKind::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(type_mismatch(path, "boolean", value))
                }
            }

            ShapeKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| type_mismatch(path, "array", value))?;
                if let Some(min) = min_items.filter(|min| arr.len() < *min) {
                    return Err(ShapeError::new(
                        path,
                        format!("array length {} is less than minimum {min}", arr.len()),
                    ));
                }
                if let Some(max) = max_items.filter(|max| arr.len() > *max) {
                    return Err(ShapeError::new(
                        path,
                        format!("array length {} is greater than maximum {max}", arr.len()),
                    ));
                }
                arr.iter()
                    .enumerate()
                    .try_for_each(|(idx, item)| items.validate_at(item, &format!("{path}[{idx}]")))
            }

            ShapeKind::Object {
                properties,
                deny_unknown,
            } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| type_mismatch(path, "object", value))?;

                for (name, shape) in properties {
                    let prop_path = format!("{path}.{name}");
                    match obj.get(name) {
                        Some(prop) => shape.validate_at(prop, &prop_path)?,
                        None if shape.required => {
                            return Err(ShapeError::new(
                                &prop_path,
                                format!("missing required property '{name}'"),
                            ));
                        }
                        None => {}
                    }
                }

                if *deny_unknown {
                    if let Some(unknown) = obj.keys().find(|k| !properties.contains_key(*k)) {
                        return Err(ShapeError::new(
                            &format!("{path}.{unknown}"),
                            format!("unknown property '{unknown}'"),
                        ));
                    }
                }
                Ok(())
            }

            ShapeKind::Any => Ok(()),

            ShapeKind::Null => {
                if value.is_null() {
                    Ok(())
                } else {
                    Err(type_mismatch(path, "null", value))
                }
            }
        }
    }
}

fn check_range<T>(path: &str, n: T, minimum: Option<T>, maximum: Option<T>) -> Result<(), ShapeError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if let Some(min) = minimum.filter(|min| n < *min) {
        return Err(ShapeError::new(
            path,
            format!("value {n} is less than minimum {min}"),
        ));
    }
    if let Some(max) = maximum.filter(|max| n > *max) {
        return Err(ShapeError::new(
            path,
            format!("value {n} is greater than maximum {max}"),
        ));
    }
    Ok(())
}

fn type_mismatch(path: &str, expected: &str, value: &Value) -> ShapeError {
    ShapeError::new(
        path,
        format!("expected {expected}, got {}", json_type_name(value)),
    )
}

/// Human-readable name of a JSON value's type.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
