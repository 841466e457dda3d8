//! Converters and iterables for dynamic segments.
//!
//! A [`Converter`] decodes a dynamic segment's raw string into a typed
//! [`ParamValue`]. Simple converters see only their own raw value. Dependent
//! converters name the parameters they consume and receive them as
//! [`ParamArgs`], already typed where the resolver got to them first.
//!
//! An [`Iterable`] enumerates the valid values of a dynamic segment, which is
//! what makes a dynamic node's children listable.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use viewtree_core::{ConversionError, ViewTreeError, ViewTreeResult};

use crate::value::{ParamValue, RawValues, TypedValues};

/// The outcome of a single conversion.
pub type ConversionResult = Result<ParamValue, ConversionError>;

/// One argument handed to a dependent converter or iterable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamArg {
    /// The parameter's already-converted value.
    Typed(ParamValue),
    /// The parameter's raw URL segment; it has not been converted yet.
    Raw(String),
}

/// Named arguments for dependent converters and iterables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamArgs {
    args: Vec<(String, ParamArg)>,
}

impl ParamArgs {
    /// Binds each name to its typed value, falling back to its raw value.
    /// Names with neither are left out.
    pub(crate) fn bind<'a>(
        names: impl IntoIterator<Item = &'a str>,
        raw: &RawValues,
        typed: &TypedValues,
    ) -> Self {
        let mut args: Vec<(String, ParamArg)> = Vec::new();
        for name in names {
            if args.iter().any(|(n, _)| n == name) {
                continue;
            }
            let arg = match (typed.get(name), raw.get(name)) {
                (Some(value), _) => ParamArg::Typed(value.clone()),
                (None, Some(value)) => ParamArg::Raw(value.clone()),
                (None, None) => continue,
            };
            args.push((name.to_string(), arg));
        }
        Self { args }
    }

    /// Returns the argument bound to `name`.
    pub fn get(&self, name: &str) -> Option<&ParamArg> {
        self.args.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Returns the typed value bound to `name`, if it was already converted.
    pub fn typed(&self, name: &str) -> Option<&ParamValue> {
        match self.get(name)? {
            ParamArg::Typed(value) => Some(value),
            ParamArg::Raw(_) => None,
        }
    }

    /// Returns the raw URL segment for `name`; for typed arguments this is
    /// the value's URL part.
    pub fn raw(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamArg::Typed(value) => Some(value.url_part()),
            ParamArg::Raw(raw) => Some(raw),
        }
    }

    /// Returns the typed value bound to `name` as a `T`.
    ///
    /// # Errors
    ///
    /// Returns an [`Other`](viewtree_core::ConversionErrorKind::Other)
    /// conversion error if `name` is unbound, not yet typed, or not a `T`.
    pub fn value<T: Any>(&self, name: &str) -> Result<&T, ConversionError> {
        let value = self
            .typed(name)
            .ok_or_else(|| ConversionError::other(format!("parameter '{name}' has no typed value")))?;
        value
            .get::<T>()
            .map_err(|e| ConversionError::other(format!("parameter '{name}': {e}")))
    }

    /// Iterates over bound names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of bound arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

type SingleFn = Arc<dyn Fn(&str) -> ConversionResult + Send + Sync>;
type DependentFn = Arc<dyn Fn(&ParamArgs) -> ConversionResult + Send + Sync>;

#[derive(Clone)]
enum Strategy {
    Single(SingleFn),
    Dependent { names: Vec<String>, func: DependentFn },
}

/// Decodes a dynamic segment's raw value into a typed value.
///
/// # Examples
///
/// ```
/// use viewtree_tree::Converter;
///
/// let conv = Converter::parse::<u32>();
/// assert!(conv.depends_on().is_empty());
/// assert!(conv.enumerate().is_none());
///
/// let colors = Converter::choices(["red", "green"]);
/// assert_eq!(colors.enumerate().unwrap().len(), 2);
/// ```
#[derive(Clone)]
pub struct Converter {
    label: &'static str,
    strategy: Strategy,
    choices: Option<Vec<ParamValue>>,
}

impl Converter {
    /// Keeps the raw value as a `String`.
    pub fn identity() -> Self {
        Self::single("identity", |raw| Ok(ParamValue::new(raw.to_string())))
    }

    /// Parses the raw value with [`FromStr`]. Parse failures are
    /// [`Invalid`](viewtree_core::ConversionErrorKind::Invalid).
    pub fn parse<T>() -> Self
    where
        T: FromStr + Any + Send + Sync + fmt::Display,
        T::Err: fmt::Display,
    {
        Self::single(std::any::type_name::<T>(), |raw| {
            raw.parse::<T>()
                .map(ParamValue::new)
                .map_err(|e| ConversionError::invalid(format!("{raw:?}: {e}")))
        })
    }

    /// Converts with a function of the raw value.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&str) -> ConversionResult + Send + Sync + 'static,
    {
        Self::single("fn", func)
    }

    /// Converts with a function of several parameters.
    ///
    /// `names` lists the parameters the function consumes; the parameter
    /// being converted is always bound as well. Each is passed typed when an
    /// earlier conversion already produced it, raw otherwise.
    pub fn dependent<I, S, F>(names: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&ParamArgs) -> ConversionResult + Send + Sync + 'static,
    {
        Self {
            label: "dependent",
            strategy: Strategy::Dependent {
                names: names.into_iter().map(Into::into).collect(),
                func: Arc::new(func),
            },
            choices: None,
        }
    }

    /// Accepts exactly the given values, matched on their URL part. The
    /// converter also enumerates them, so a dynamic child using it lists its
    /// children without a separate iterable.
    pub fn choices<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        let values: Vec<ParamValue> = values.into_iter().map(Into::into).collect();
        let lookup = values.clone();
        let mut conv = Self::single("choices", move |raw| {
            lookup
                .iter()
                .find(|v| v.url_part() == raw)
                .cloned()
                .ok_or_else(|| ConversionError::not_found(format!("{raw:?} is not a known choice")))
        });
        conv.choices = Some(values);
        conv
    }

    fn single<F>(label: &'static str, func: F) -> Self
    where
        F: Fn(&str) -> ConversionResult + Send + Sync + 'static,
    {
        Self {
            label,
            strategy: Strategy::Single(Arc::new(func)),
            choices: None,
        }
    }

    /// Returns the parameter names a dependent converter consumes.
    pub fn depends_on(&self) -> &[String] {
        match &self.strategy {
            Strategy::Single(_) => &[],
            Strategy::Dependent { names, .. } => names,
        }
    }

    /// Returns every value the converter accepts, if it is finite and known.
    pub fn enumerate(&self) -> Option<Vec<ParamValue>> {
        self.choices.clone()
    }

    /// Converts parameter `name` given the values known so far.
    pub fn convert(&self, name: &str, raw: &RawValues, typed: &TypedValues) -> ConversionResult {
        match &self.strategy {
            Strategy::Single(func) => {
                let value = raw
                    .get(name)
                    .ok_or_else(|| ConversionError::invalid(format!("missing raw value for '{name}'")))?;
                func(value)
            }
            Strategy::Dependent { names, func } => {
                let names = names.iter().map(String::as_str).chain(std::iter::once(name));
                func(&ParamArgs::bind(names, raw, typed))
            }
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("kind", &self.label)
            .field("depends_on", &self.depends_on())
            .field("choices", &self.choices.as_ref().map(Vec::len))
            .finish()
    }
}

type IterableFn = Arc<dyn Fn(&ParamArgs) -> ViewTreeResult<Vec<ParamValue>> + Send + Sync>;

/// Enumerates the valid values of a dynamic segment.
#[derive(Clone)]
pub enum Iterable {
    /// A fixed, finite set of values.
    Values(Vec<ParamValue>),
    /// Values computed from the parent's parameters.
    Dependent(IterableFn),
}

impl Iterable {
    /// A fixed set of values, enumerated in the given order.
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self::Values(values.into_iter().map(Into::into).collect())
    }

    /// Values computed from the parent's typed (or raw) parameters.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&ParamArgs) -> ViewTreeResult<Vec<ParamValue>> + Send + Sync + 'static,
    {
        Self::Dependent(Arc::new(func))
    }

    /// Produces the values for the given parent arguments.
    pub fn enumerate(&self, args: &ParamArgs) -> ViewTreeResult<Vec<ParamValue>> {
        match self {
            Self::Values(values) => Ok(values.clone()),
            Self::Dependent(func) => func(args),
        }
    }
}

impl fmt::Debug for Iterable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values(values) => f.debug_tuple("Values").field(values).finish(),
            Self::Dependent(_) => f.write_str("Dependent(..)"),
        }
    }
}

/// Builds an error for a dynamic segment that cannot be enumerated.
pub(crate) fn not_iterable(var_name: &str) -> ViewTreeError {
    ViewTreeError::NotIterable(var_name.to_string())
}

#[cfg(test)]
mod tests {
    use viewtree_core::ConversionErrorKind;

    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawValues {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn test_identity() {
        let v = Converter::identity()
            .convert("slug", &raw(&[("slug", "hello")]), &TypedValues::new())
            .unwrap();
        assert_eq!(v.get::<String>().unwrap(), "hello");
    }

    #[test]
    fn test_parse_success_and_failure() {
        let conv = Converter::parse::<i64>();
        let v = conv
            .convert("id", &raw(&[("id", "12")]), &TypedValues::new())
            .unwrap();
        assert_eq!(*v.get::<i64>().unwrap(), 12);

        let err = conv
            .convert("id", &raw(&[("id", "abc")]), &TypedValues::new())
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::Invalid);
    }

    #[test]
    fn test_single_missing_raw_value() {
        let err = Converter::identity()
            .convert("id", &RawValues::new(), &TypedValues::new())
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::Invalid);
    }

    #[test]
    fn test_dependent_sees_typed_parent() {
        let conv = Converter::dependent(["author"], |args: &ParamArgs| {
            let author = args.value::<String>("author")?;
            let index: usize = args
                .raw("book")
                .unwrap_or_default()
                .parse()
                .map_err(|_| ConversionError::invalid("not an index"))?;
            Ok(ParamValue::new(format!("{author}#{index}")))
        });
        assert_eq!(conv.depends_on(), ["author".to_string()]);

        let typed: TypedValues = [("author", ParamValue::from("ann"))].into_iter().collect();
        let v = conv
            .convert("book", &raw(&[("author", "ann"), ("book", "2")]), &typed)
            .unwrap();
        assert_eq!(v.to_string(), "ann#2");
    }

    #[test]
    fn test_dependent_falls_back_to_raw() {
        let conv = Converter::dependent(["a"], |args: &ParamArgs| {
            assert!(args.typed("a").is_none());
            Ok(ParamValue::new(args.raw("a").unwrap_or_default().to_string()))
        });
        let v = conv
            .convert("b", &raw(&[("a", "x"), ("b", "y")]), &TypedValues::new())
            .unwrap();
        assert_eq!(v.to_string(), "x");
    }

    #[test]
    fn test_choices() {
        let conv = Converter::choices(["red", "green"]);
        let v = conv
            .convert("color", &raw(&[("color", "green")]), &TypedValues::new())
            .unwrap();
        assert_eq!(v.get::<String>().unwrap(), "green");
        let err = conv
            .convert("color", &raw(&[("color", "blue")]), &TypedValues::new())
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::NotFound);
    }

    #[test]
    fn test_iterable_values_and_fn() {
        let fixed = Iterable::values([1_i64, 2, 3]);
        let values = fixed.enumerate(&ParamArgs::default()).unwrap();
        assert_eq!(
            values.iter().map(ParamValue::url_part).collect::<Vec<_>>(),
            vec!["1", "2", "3"]
        );

        let computed = Iterable::from_fn(|args: &ParamArgs| {
            let n: i64 = args.raw("n").unwrap_or("0").parse().unwrap_or(0);
            Ok((0..n).map(ParamValue::new).collect())
        });
        let args = ParamArgs::bind(["n"], &raw(&[("n", "2")]), &TypedValues::new());
        assert_eq!(computed.enumerate(&args).unwrap().len(), 2);
    }

    #[test]
    fn test_param_args_skip_unknown_and_duplicates() {
        let args = ParamArgs::bind(["a", "a", "zzz"], &raw(&[("a", "1")]), &TypedValues::new());
        assert_eq!(args.len(), 1);
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["a"]);
        assert!(args.value::<i64>("a").is_err());
    }
}
