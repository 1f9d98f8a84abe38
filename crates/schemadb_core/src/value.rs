//! Dynamic document values.

use crate::schema::RowType;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A dynamic field value.
///
/// Stored documents only hold the four primitive variants. `Null` appears
/// in patches (to clear an optional row) and in where clauses, and marks a
/// missing related record. `Object` only appears in query results, holding
/// a related document loaded through `include`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Text.
    String(String),
    /// Double precision number.
    Number(f64),
    /// Boolean.
    Boolean(bool),
    /// 64-bit signed integer.
    BigInt(i64),
    /// A related document attached by the relation loader.
    Object(Document),
}

impl Value {
    /// Returns the row type this value belongs to, if it is a primitive.
    #[must_use]
    pub fn row_type(&self) -> Option<RowType> {
        match self {
            Value::String(_) => Some(RowType::String),
            Value::Number(_) => Some(RowType::Number),
            Value::Boolean(_) => Some(RowType::Boolean),
            Value::BigInt(_) => Some(RowType::BigInt),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Returns true if this value may be stored in a row of type `ty`.
    ///
    /// NaN is not storable.
    #[must_use]
    pub fn is_type(&self, ty: RowType) -> bool {
        match self {
            Value::Number(n) if n.is_nan() => false,
            _ => self.row_type() == Some(ty),
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer, if this is a bigint.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the related document, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(d) => Some(d),
            _ => None,
        }
    }

    /// Orders two values of the same primitive variant.
    ///
    /// Values of different variants, nulls and objects are unordered.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Converts a JSON scalar. Arrays and objects have no counterpart.
    ///
    /// JSON numbers always become [`Value::Number`].
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::BigInt(_) => "bigint",
            Value::Object(_) => "object",
        }
    }
}

/// Hashable form of a primitive value, for uniqueness and relation lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Str(String),
    Num(u64),
    Bool(bool),
    Big(i64),
}

impl Value {
    /// Returns the hashable key of a primitive value. `Null` and objects have none.
    pub(crate) fn key(&self) -> Option<ValueKey> {
        match self {
            Value::String(s) => Some(ValueKey::Str(s.clone())),
            // -0.0 == 0.0, so they must share a key
            Value::Number(n) if *n == 0.0 => Some(ValueKey::Num(0f64.to_bits())),
            Value::Number(n) => Some(ValueKey::Num(n.to_bits())),
            Value::Boolean(b) => Some(ValueKey::Bool(*b)),
            Value::BigInt(i) => Some(ValueKey::Big(*i)),
            Value::Null | Value::Object(_) => None,
        }
    }
}

macro_rules! number_from {
    ($($ty:ty),+) => {
        $(
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Number(f64::from(value))
            }
        }
        )+
    };
}
number_from!(f64, f32, i32, u32, i16, u16, i8, u8);

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::BigInt(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A document: row names mapped to values.
///
/// Absent optional rows are simply missing from the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value of a field, treating `Null` as absent.
    #[must_use]
    pub fn get_present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Returns a related document attached under `relation`.
    #[must_use]
    pub fn related(&self, relation: &str) -> Option<&Document> {
        self.0.get(relation).and_then(Value::as_object)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder form of [`Document::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Removes a field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns true if the field is set (even to `Null`).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Iterates over field names in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies a patch: `Null` clears a field, anything else overwrites it.
    pub fn merge(&mut self, patch: &Document) {
        for (key, value) in patch.iter() {
            if value.is_null() {
                self.0.remove(key);
            } else {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    /// Consumes the document, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a [`Document`] from `key => value` pairs.
///
/// ```rust
/// use schemadb_core::{doc, Value};
///
/// let d = doc! { "name" => "alice", "age" => 31, "admin" => false };
/// assert_eq!(d.get("age"), Some(&Value::Number(31.0)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::Document::new();
        $( document.insert($key, $value); )+
        document
    }};
}
