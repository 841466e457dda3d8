//! Parameter values.
//!
//! A dynamic segment has two representations: the raw string extracted from
//! the URL and the typed value its converter produced. Typed values are
//! application types, so they are stored type-erased in a [`ParamValue`]
//! together with the strings needed to display them and to put them back
//! into a URL.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use viewtree_core::{ViewTreeError, ViewTreeResult};

/// A value that knows its own URL segment.
///
/// Implement this when a typed value's URL form differs from its display
/// form, e.g. a record displayed by title but addressed by id.
pub trait UrlPart {
    /// Returns the raw (unencoded) URL segment for this value.
    fn url_part(&self) -> String;
}

/// A type-erased typed parameter value.
///
/// # Examples
///
/// ```
/// use viewtree_tree::ParamValue;
///
/// let value = ParamValue::new(42_i64);
/// assert_eq!(*value.get::<i64>().unwrap(), 42);
/// assert_eq!(value.url_part(), "42");
/// assert!(value.get::<String>().is_err());
/// ```
#[derive(Clone)]
pub struct ParamValue {
    inner: Arc<dyn Any + Send + Sync>,
    display: String,
    url_part: String,
    type_name: &'static str,
}

impl ParamValue {
    /// Wraps a value whose display form is also its URL segment.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self {
            url_part: display.clone(),
            display,
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Wraps a value that provides its own URL segment.
    pub fn reversible<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display + UrlPart,
    {
        Self {
            display: value.to_string(),
            url_part: value.url_part(),
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Wraps a value with explicit display and URL forms.
    pub fn with_parts<T>(value: T, display: impl Into<String>, url_part: impl Into<String>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            inner: Arc::new(value),
            display: display.into(),
            url_part: url_part.into(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the value as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::TypeMismatch`] if the value is not a `T`.
    pub fn get<T: Any>(&self) -> ViewTreeResult<&T> {
        self.downcast_ref::<T>().ok_or(ViewTreeError::TypeMismatch {
            expected: type_name::<T>(),
            found: self.type_name,
        })
    }

    /// Returns the value as `T`, or `None` if it is another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns `true` if the value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Returns the raw URL segment for this value.
    pub fn url_part(&self) -> &str {
        &self.url_part
    }

    /// Returns the Rust type name of the wrapped value.
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamValue")
            .field("type", &self.type_name)
            .field("display", &self.display)
            .field("url_part", &self.url_part)
            .finish()
    }
}

/// Two values are equal when they have the same type and the same URL form.
impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.url_part == other.url_part
    }
}

impl Eq for ParamValue {}

macro_rules! impl_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParamValue {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

impl_from_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char, String);

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

/// An ordered parameter-name → value map.
///
/// Entries keep insertion order, which for maps built by the tree is
/// root-to-leaf parameter order. Equality ignores order.
#[derive(Clone)]
pub struct ParamMap<V> {
    entries: Vec<(String, V)>,
}

/// Raw values: parameter name → undecoded URL segment.
pub type RawValues = ParamMap<String>;

/// Typed values: parameter name → converter output.
pub type TypedValues = ParamMap<ParamValue>;

impl<V> Default for ParamMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> ParamMap<V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value for `name`.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns `true` if the map has a value for `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Sets the value for `name`, keeping its position if already present.
    pub fn insert(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Removes and returns the value for `name`.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over parameter names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<V: Clone> ParamMap<V> {
    /// Returns a copy with `name` set to `value`.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, value: V) -> Self {
        let mut map = self.clone();
        map.insert(name, value);
        map
    }

    /// Returns a copy without `name`.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut map = self.clone();
        map.remove(name);
        map
    }

    /// Returns a copy keeping only the given names, in their order here.
    #[must_use]
    pub fn retain_names(&self, names: &[String]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| names.contains(k))
                .cloned()
                .collect(),
        }
    }
}

impl RawValues {
    /// Converts to the map shape the routing layer's reverse lookup takes.
    pub fn to_hash_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

impl<V: PartialEq> PartialEq for ParamMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<V: Eq> Eq for ParamMap<V> {}

impl<V: fmt::Debug> fmt::Debug for ParamMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for ParamMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
