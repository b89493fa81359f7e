use std::{cmp::Ordering, fmt, ops::Range, rc::Rc};

use rust_decimal::{Decimal, prelude::FromPrimitive};

/// A tree-shaped value that path expressions navigate.
///
/// Scalars mirror JSON, with integers kept apart from floats. Arrays and
/// objects are reference-counted, so handing a subtree to a deferred
/// continuation clones a pointer rather than the data.
///
/// # Examples
///
/// ```
/// use pathfind::Value;
///
/// let scalar = Value::Integer(42);
/// let list = Value::array([Value::from("a"), Value::from("b")]);
/// let record = Value::object([("maker", Value::from("Honda")), ("year", Value::from(2010))]);
///
/// assert!(list.is_composite());
/// assert_eq!(record.field("year"), Some(&Value::Integer(2010)));
/// assert!(!scalar.is_composite());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Ordered list of values
    Array(Rc<Vec<Value>>),

    /// Object with string keys, kept in declaration order
    Object(Rc<Map>),
}

/// Insertion-ordered string-keyed map used for object values.
#[derive(Debug, Clone, Default)]
pub struct Map {
    entries: Vec<(String, Value)>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a member. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

// Member order does not take part in equality.
impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Name of a child inside its composite parent.
///
/// # Examples
/// - `items.0` → `Index(0)` when `items` is an array
/// - `user.name` → `Name("name")`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Array element position
    Index(usize),

    /// Object member name
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(n) => f.write_str(n),
        }
    }
}

/// An ordered-iteration request over the children of a composite value.
///
/// `start` may be negative to count from the end. A `limit` of `None` or
/// zero means "until the end". When `reverse` is set the selected window is
/// visited back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub start: i64,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl Window {
    /// Every child, in declaration order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: i64, limit: Option<usize>, reverse: bool) -> Self {
        Window {
            start,
            limit,
            reverse,
        }
    }

    /// Resolve the window against a sequence of `len` items.
    pub fn range(&self, len: usize) -> Range<usize> {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let mut limit = match self.limit {
            Some(l) if l > 0 => i64::try_from(l).unwrap_or(i64::MAX),
            _ => len,
        };
        let mut start = self.start;

        if start < 0 {
            start = start.saturating_add(len);
        }
        if start.saturating_add(limit) > len {
            limit = len.saturating_sub(start);
        }
        if start < 0 {
            start = 0;
            limit = len;
        }
        if limit <= 0 {
            return 0..0;
        }

        let start = start as usize;
        start..start + limit as usize
    }
}

impl Value {
    /// Build an array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(items.into_iter().collect()))
    }

    /// Build an object value, keeping member order.
    pub fn object<K: Into<String>>(members: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(members.into_iter().collect()))
    }

    /// Human-readable type name, as reported by the `type` capability.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Check if the value is truthy (for filters and combinators).
    ///
    /// Composite values are always truthy, even when empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) => Some(n.round() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a direct child by key.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        match (self, key) {
            (Value::Array(items), Key::Index(i)) => items.get(*i),
            (Value::Object(map), Key::Name(name)) => map.get(name),
            (Value::Object(map), Key::Index(i)) => map.get(&i.to_string()),
            (Value::Array(items), Key::Name(name)) => {
                name.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            _ => None,
        }
    }

    /// Look up a member by its textual name. Numeric names index arrays.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.get(&Key::Name(name.to_string()))
    }

    /// Ordered iteration over direct children within `window`.
    ///
    /// Scalars have no children.
    pub fn children(&self, window: Window) -> Vec<(Key, Value)> {
        let mut selected: Vec<(Key, Value)> = match self {
            Value::Array(items) => {
                let range = window.range(items.len());
                items[range.clone()]
                    .iter()
                    .zip(range)
                    .map(|(v, i)| (Key::Index(i), v.clone()))
                    .collect()
            }
            Value::Object(map) => {
                let range = window.range(map.len());
                map.iter()
                    .skip(range.start)
                    .take(range.len())
                    .map(|(k, v)| (Key::Name(k.to_string()), v.clone()))
                    .collect()
            }
            _ => Vec::new(),
        };

        if window.reverse {
            selected.reverse();
        }
        selected
    }

    /// Text form used for pattern matching and the `to_string` capability.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => self.to_string(),
        }
    }

    /// Strict equality: numbers compare by value across integer/float,
    /// every other pairing must share a type.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                compare_numbers(self, other) == Some(Ordering::Equal)
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.strict_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.strict_eq(w)))
            }
            _ => self == other,
        }
    }

    /// Ordering for comparison operators. `None` when the pair is unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                compare_numbers(self, other)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Float(y)) => match (Decimal::from_i64(*x), Decimal::from_f64(*y)) {
            (Some(xd), Some(yd)) => Some(xd.cmp(&yd)),
            _ => (*x as f64).partial_cmp(y),
        },
        (Value::Float(_), Value::Integer(_)) => compare_numbers(b, a).map(Ordering::reverse),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::convert::to_json(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(Rc::new(map))
    }
}
