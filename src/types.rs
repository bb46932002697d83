//! Core types for spark-view.
//!
//! These types flow through every binding: the dynamic [`Value`] that view
//! programs compute and compare, the change records handed to `on_changes`,
//! and the bitflag sets that track per-view and per-instance state.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed binding value.
///
/// Primitives compare by value. Arrays, objects and opaque handles compare by
/// identity (`Rc::ptr_eq`), which is what change detection relies on: a literal
/// rebuilt every pass would always look changed, a memoized one never does.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<IndexMap<String, Value>>),
    /// Any other shared handle (element nodes, query lists, user data).
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Build an array value (fresh identity).
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    /// Build an object value (fresh identity, insertion ordered).
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Wrap an arbitrary shared handle.
    pub fn opaque<T: Any>(value: Rc<T>) -> Self {
        Value::Opaque(value)
    }

    /// Identity comparison used by change detection.
    ///
    /// Numbers follow `Object.is`-like rules: `NaN` is the same as `NaN`.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// True for `Undefined` and `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Property lookup on objects; `Undefined` for anything else.
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.get(key).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Index lookup on arrays; `Undefined` when out of range.
    pub fn at(&self, index: usize) -> Value {
        match self {
            Value::Array(items) => items.get(index).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Number of elements for arrays, entries for objects, 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Downcast an opaque handle.
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Value::Opaque(any) => any.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// String conversion used by interpolation and text bindings.
    ///
    /// `Undefined` and `Null` render as the empty string.
    pub fn stringify(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => items
                .iter()
                .map(Value::stringify)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Opaque(_) => "[object]".to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.iter()).finish(),
            Value::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

/// Structural equality (for assertions and `SimpleChange` inspection).
/// Change detection uses [`Value::same`] instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => self.same(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Cleanup Function
// =============================================================================

/// Teardown callback registered by a view (listener removal, subscriptions).
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Input Change Records
// =============================================================================

/// One input's change between two passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleChange {
    pub previous: Value,
    pub current: Value,
    pub first_change: bool,
}

/// Changes keyed by the directive's internal input name, in write order.
pub type SimpleChanges = indexmap::IndexMap<String, SimpleChange>;

// =============================================================================
// State Flags
// =============================================================================

bitflags::bitflags! {
    /// Per-view state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewFlags: u8 {
        /// The creation pass has completed.
        const CREATED = 1 << 0;
        /// The view is running in check-no-changes mode.
        const CHECKING = 1 << 1;
        /// The view has been torn down.
        const DESTROYED = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Which "init" hooks an instance has already received.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HookState: u8 {
        const INIT = 1 << 0;
        const CONTENT_INIT = 1 << 1;
        const VIEW_INIT = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_compare_by_value() {
        assert!(Value::from("a").same(&Value::from("a")));
        assert!(Value::from(1).same(&Value::from(1.0)));
        assert!(Value::Number(f64::NAN).same(&Value::Number(f64::NAN)));
        assert!(!Value::Null.same(&Value::Undefined));
    }

    #[test]
    fn test_literals_compare_by_identity() {
        let a = Value::array([Value::from(1)]);
        let b = Value::array([Value::from(1)]);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
        // Structural equality still holds
        assert_eq!(a, b);
    }

    #[test]
    fn test_stringify() {
        assert_eq!(Value::Undefined.stringify(), "");
        assert_eq!(Value::Null.stringify(), "");
        assert_eq!(Value::from(500).stringify(), "500");
        assert_eq!(Value::from(0.5).stringify(), "0.5");
        assert_eq!(Value::from(-0.0).stringify(), "0");
        assert_eq!(Value::from(true).stringify(), "true");
        assert_eq!(
            Value::array([Value::from("a"), Value::Null, Value::from(2)]).stringify(),
            "a,,2"
        );
        assert_eq!(Value::object([("a", Value::from(1))]).stringify(), "[object Object]");
    }

    #[test]
    fn test_lookups() {
        let config = Value::object([
            ("duration", Value::from(500)),
            ("actions", Value::array([Value::object([("opacity", Value::from(0))])])),
        ]);
        assert_eq!(config.get("duration"), Value::from(500));
        assert_eq!(config.get("actions").at(0).get("opacity"), Value::from(0));
        assert!(config.get("missing").is_nullish());
        assert!(config.get("actions").at(3).is_nullish());
    }

    #[test]
    fn test_opaque_downcast() {
        let handle = Rc::new(42u32);
        let value = Value::opaque(handle.clone());
        assert_eq!(value.downcast::<u32>().as_deref(), Some(&42));
        assert!(value.downcast::<String>().is_none());
        assert!(value.same(&Value::opaque(handle)));
    }
}
