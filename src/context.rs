use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use crate::value::Value;

/// The data environment a template is rendered against.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    data: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: AsRef<str>, V: Into<Value>>(&mut self, name: T, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&Value> {
        self.data.get(name.as_ref())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.data.contains_key(name.as_ref())
    }

    /// Looks up a dotted path. Every segment after the first indexes into the
    /// dictionary found so far; a missing key or a non-dictionary along the
    /// way yields `None`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.data.get(first.as_ref())?;
        for segment in rest {
            current = current.as_dictionary()?.get(segment.as_ref())?;
        }
        Some(current)
    }

    /// The whole environment as a dictionary value.
    pub fn to_value(&self) -> Value {
        Value::Dictionary(self.data.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(data: BTreeMap<String, Value>) -> Self {
        Self { data }
    }
}

/// Opaque values passed through to every tag unchanged.
#[derive(Clone, Default)]
pub struct UserInfo {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl UserInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, T: Any + Send + Sync>(&mut self, key: K, value: T) -> &mut Self {
        self.entries.insert(key.into(), Arc::new(value));
        self
    }

    /// Returns the entry under `key` if it holds a `T`.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}
