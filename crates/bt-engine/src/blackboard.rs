//! Per-instance scratch store shared by the nodes of one tree.
//!
//! Every runtime tree instance owns exactly one [`Blackboard`]. Templates
//! never have one, and instances never share theirs, so two agents ticking
//! clones of the same template cannot see each other's values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value stored on the blackboard.
///
/// The set of variants is closed on purpose: decorators that compare values
/// go through [`Value::coerce_int`], and that table has to stay fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Float(f64),
    /// A countable collection. Only its length matters for coercion.
    List(Vec<Value>),
    Text(String),
}

impl Value {
    /// Coerces the value to an integer for comparisons.
    ///
    /// | Variant | Result |
    /// |---|---|
    /// | `Int(n)` | `n` |
    /// | `Bool(b)` | `0` or `1` |
    /// | `Float(f)` | nearest integer, ties to even (`NaN` is `0`) |
    /// | `List(items)` | `items.len()` |
    /// | `Text(_)` | `0` |
    pub fn coerce_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Bool(b) => i64::from(*b),
            // `as` saturates out-of-range floats and maps NaN to 0.
            Value::Float(f) => f.round_ties_even() as i64,
            Value::List(items) => i64::try_from(items.len()).unwrap_or(i64::MAX),
            Value::Text(_) => 0,
        }
    }

    /// Short name of the variant, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::List(_) => "list",
            Value::Text(_) => "text",
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

/// String-keyed store of [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blackboard {
    values: BTreeMap<String, Value>,
}

impl Blackboard {
    /// Creates an empty blackboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the stored value, or `default` when the key is absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// Returns the coerced integer under `key`, or `default` when absent.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).map_or(default, Value::coerce_int)
    }

    /// Stores `value` under `key`, returning the previous value if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// Returns `true` if `key` holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no key is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
