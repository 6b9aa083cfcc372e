use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A field value carried by a [`Record`].
///
/// The coordination layer does not interpret values; it only moves them
/// between the caller and the driver. The set of variants is the minimum a
/// relational payload needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys in the
/// [`record!`](crate::record!) macro.
pub fn normalize(key: &str) -> String {
    key.trim_matches('"').to_string()
}

/// A flat field/value map used as the query payload.
///
/// # Purpose
/// `Record` is what bound models insert and what queries return. Fields are
/// kept in a `BTreeMap` so iteration order is deterministic, which keeps
/// test assertions and log output stable.
///
/// # Usage
/// ```rust,ignore
/// use enlist::record;
///
/// let row = record! {
///     name: "Alice",
///     balance: 100,
/// };
/// assert_eq!(row.get_text("name"), Some("Alice"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Record {
        Record {
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field, replacing any previous value. Keys are normalized so
    /// quoted and bare keys address the same field.
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(normalize(key), value);
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(&normalize(key))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(&normalize(key))
    }

    /// Iterates fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (key, value) in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
            first = false;
        }
        write!(f, "}}")
    }
}

/// Builds a [`Record`] from key/value pairs.
///
/// Keys may be bare identifiers or string literals; values are anything
/// convertible into [`Value`]. Wrap compound expressions in parentheses.
///
/// ```rust,ignore
/// use enlist::record;
///
/// let empty = record! {};
/// let row = record! {
///     name: "Alice",
///     age: 30,
///     score: (10 * 7),
/// };
/// ```
#[macro_export]
macro_rules! record {
    // match an empty record
    () => {
        $crate::record::Record::new()
    };

    // match a record with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::record_value;

            let mut record = $crate::record::Record::new();
            $(
                record.set(stringify!($key), $crate::record_value!($value));
            )*
            record
        }
    };
}

/// Helper macro to convert values for the `record!` macro.
#[macro_export]
macro_rules! record_value {
    // match an expression (variable, function call, arithmetic in parens, literals, etc.)
    ($value:expr) => {
        $crate::record::Value::from($value)
    };
}
