//! Tagged route parameter values.
//!
//! # Responsibilities
//! - Represent parameter bags without untyped maps
//! - Define the override discipline used when parameter sets are layered
//! - Render scalars as text for URL generation
//!
//! # Design Decisions
//! - Maps are ordered (`BTreeMap`) so merges and serialization are deterministic
//! - Map + map merges recursively, list + list appends, anything else is replaced

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter name → value mapping.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// A single route parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(ParamMap),
}

impl ParamValue {
    /// Text form of a scalar value, `None` for lists and maps.
    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            ParamValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            ParamValue::Int(i) => Some(i.to_string()),
            ParamValue::Float(f) => Some(f.to_string()),
            ParamValue::String(s) => Some(s.clone()),
            ParamValue::List(_) | ParamValue::Map(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ParamValue::List(_) | ParamValue::Map(_))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ParamValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            scalar => write!(f, "{}", scalar.as_scalar_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<ParamMap> for ParamValue {
    fn from(map: ParamMap) -> Self {
        ParamValue::Map(map)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(items: Vec<ParamValue>) -> Self {
        ParamValue::List(items)
    }
}

/// Merge `overlay` into `base`.
///
/// Keys present on both sides with map values are merged recursively; list
/// values are concatenated; any other collision is won by `overlay`.
pub fn merge_params(base: &mut ParamMap, overlay: ParamMap) {
    for (key, incoming) in overlay {
        match base.get_mut(&key) {
            Some(existing) => merge_value(existing, incoming),
            None => {
                base.insert(key, incoming);
            }
        }
    }
}

fn merge_value(existing: &mut ParamValue, incoming: ParamValue) {
    match (existing, incoming) {
        (ParamValue::Map(current), ParamValue::Map(next)) => merge_params(current, next),
        (ParamValue::List(current), ParamValue::List(next)) => current.extend(next),
        (slot, next) => *slot = next,
    }
}

/// Build a `ParamMap` from `(name, value)` pairs.
///
/// ```
/// use route_resolver::params;
/// let p = params! { "slug" => "hello", "page" => 2i64 };
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::routing::value::ParamMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::routing::value::ParamMap::new();
        $( map.insert(($key).to_string(), $crate::routing::value::ParamValue::from($value)); )+
        map
    }};
}
