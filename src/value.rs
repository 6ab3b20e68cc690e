use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, OnceLock},
};

/// A deferred [`Value`], produced on first use and memoized afterwards.
///
/// Clones share the producer and the memoized result, so forcing any clone
/// forces them all.
#[derive(Clone)]
pub struct Lazy {
    producer: Arc<dyn Fn() -> Value + Send + Sync>,
    cell: Arc<OnceLock<Value>>,
}

impl Lazy {
    /// Wraps `producer`, which runs at most once, on first use.
    ///
    /// The producer must not force the value it belongs to, directly or
    /// through a clone: the nested call waits on the initialization already
    /// in progress and never returns.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Runs the producer if it has not run yet and returns its result.
    ///
    /// A producer returning another lazy value is forced through.
    pub fn force(&self) -> &Value {
        self.cell.get_or_init(|| match (self.producer)() {
            Value::Lazy(inner) => inner.force().clone(),
            value => value,
        })
    }

    pub fn is_forced(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Lazy").field(value).finish(),
            None => f.write_str("Lazy(<pending>)"),
        }
    }
}

/// The dynamically typed runtime value templates operate on.
#[derive(Debug, Clone, Default)]
pub enum Value {
    Bool(bool),
    String(String),
    Int(i64),
    Double(f64),
    /// An opaque byte blob.
    Data(Vec<u8>),
    Array(Vec<Value>),
    Dictionary(BTreeMap<String, Value>),
    Lazy(Lazy),
    #[default]
    Null,
}

impl Value {
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        Self::Lazy(Lazy::new(producer))
    }

    /// Returns the value itself, or the forced result for a lazy value.
    pub fn resolved(&self) -> &Self {
        match self {
            Self::Lazy(lazy) => lazy.force(),
            Self::Bool(_)
            | Self::String(_)
            | Self::Int(_)
            | Self::Double(_)
            | Self::Data(_)
            | Self::Array(_)
            | Self::Dictionary(_)
            | Self::Null => self,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.resolved(), Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.resolved() {
            Self::Bool(b) => Some(*b),
            Self::String(s) => match s.as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Self::Int(i) => Some(*i != 0),
            Self::Double(d) => Some(*d != 0.0),
            Self::Data(_) | Self::Array(_) | Self::Dictionary(_) | Self::Lazy(_) | Self::Null => {
                None
            }
        }
    }

    /// Boolean coercion used by `!`, `&&` and `||`: the boolean value when one
    /// exists, otherwise anything but null is true.
    pub fn truthy(&self) -> bool {
        self.as_bool().unwrap_or_else(|| !self.is_null())
    }

    /// The string form of the value, if it has one.
    pub fn as_string(&self) -> Option<String> {
        match self.resolved() {
            Self::Bool(b) => Some(b.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Double(d) => Some(d.to_string()),
            Self::Data(bytes) => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Self::Array(_) | Self::Dictionary(_) | Self::Lazy(_) | Self::Null => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.resolved() {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::String(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i),
            Self::Double(d) => double_to_int(*d),
            Self::Data(_) | Self::Array(_) | Self::Dictionary(_) | Self::Lazy(_) | Self::Null => {
                None
            }
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.resolved() {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(s) => s.trim().parse().ok(),
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            Self::Data(_) | Self::Array(_) | Self::Dictionary(_) | Self::Lazy(_) | Self::Null => {
                None
            }
        }
    }

    pub fn as_data(&self) -> Option<Vec<u8>> {
        match self.resolved() {
            Self::String(s) => Some(s.clone().into_bytes()),
            Self::Data(bytes) => Some(bytes.clone()),
            Self::Bool(_)
            | Self::Int(_)
            | Self::Double(_)
            | Self::Array(_)
            | Self::Dictionary(_)
            | Self::Lazy(_)
            | Self::Null => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self.resolved() {
            Self::Array(items) => Some(items),
            Self::Bool(_)
            | Self::String(_)
            | Self::Int(_)
            | Self::Double(_)
            | Self::Data(_)
            | Self::Dictionary(_)
            | Self::Lazy(_)
            | Self::Null => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Self>> {
        match self.resolved() {
            Self::Dictionary(map) => Some(map),
            Self::Bool(_)
            | Self::String(_)
            | Self::Int(_)
            | Self::Double(_)
            | Self::Data(_)
            | Self::Array(_)
            | Self::Lazy(_)
            | Self::Null => None,
        }
    }

    /// Name of the value's kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Data(_) => "data",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Lazy(_) => "lazy",
            Self::Null => "null",
        }
    }
}

fn double_to_int(d: f64) -> Option<i64> {
    let in_range = d >= i64::MIN as f64 && d < i64::MAX as f64;
    (d.is_finite() && in_range).then(|| d.trunc() as i64)
}

/// Structural equality: same kind and same content. Lazy values compare by
/// their forced result.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolved(), other.resolved()) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Dictionary(a), Self::Dictionary(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(value: BTreeMap<String, Self>) -> Self {
        Self::Dictionary(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Self>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Dictionary(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self.resolved() {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::String(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Double(d) => serializer.serialize_f64(*d),
            Self::Data(bytes) => serializer.serialize_bytes(bytes),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Dictionary(map) => serializer.collect_map(map),
            Self::Lazy(_) | Self::Null => serializer.serialize_unit(),
        }
    }
}
