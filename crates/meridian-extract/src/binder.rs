//! Type-directed binding of string parameters.
//!
//! A [`Binder`] turns the string values stored under a parameter name into a
//! value of one concrete type. [`Binders`] maps a runtime [`TypeTag`] to the
//! binder for that type; it is assembled once at startup and shared read-only
//! by every request.
//!
//! Binding never fails on bad data. A value that does not parse becomes the
//! type's zero value (`Default::default()`), leaving validation to the action.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::params::Params;
use crate::upload::{Storage, Upload};

/// A bound value, erased to be passed positionally to an action.
pub type BoundValue = Box<dyn Any + Send>;

/// Runtime identity of a bindable type.
#[derive(Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Returns the tag for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Converts the values under a parameter name into one typed value.
pub trait Binder: Send + Sync + 'static {
    /// Produces the bound value for `name`.
    ///
    /// The returned box must hold exactly the type this binder is registered
    /// for.
    fn bind(&self, params: &mut Params, name: &str) -> BoundValue;
}

impl<F> Binder for F
where
    F: Fn(&mut Params, &str) -> BoundValue + Send + Sync + 'static,
{
    fn bind(&self, params: &mut Params, name: &str) -> BoundValue {
        self(params, name)
    }
}

/// A scalar that can be parsed from one parameter string.
pub trait FromParam: Default + Send + 'static {
    /// Parses `value`, returning `None` when it is not valid for the type.
    fn from_param(value: &str) -> Option<Self>;
}

macro_rules! impl_from_param_parse {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromParam for $ty {
                fn from_param(value: &str) -> Option<Self> {
                    value.trim().parse().ok()
                }
            }
        )*
    };
}

impl_from_param_parse!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl FromParam for String {
    fn from_param(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromParam for char {
    fn from_param(value: &str) -> Option<Self> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        }
    }
}

impl FromParam for bool {
    fn from_param(value: &str) -> Option<Self> {
        let value = value.trim();
        Some(
            ["true", "on", "1", "yes"]
                .iter()
                .any(|truthy| value.eq_ignore_ascii_case(truthy)),
        )
    }
}

/// Binds the first value of a parameter as `T`.
pub struct ValueBinder<T>(PhantomData<fn() -> T>);

impl<T> ValueBinder<T> {
    /// Creates the binder.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromParam> Binder for ValueBinder<T> {
    fn bind(&self, params: &mut Params, name: &str) -> BoundValue {
        let value = params
            .get(name)
            .and_then(T::from_param)
            .unwrap_or_default();
        Box::new(value)
    }
}

/// Indexed keys at or above this index are ignored when binding a `Vec<T>`.
pub const MAX_SLICE_INDEX: usize = 10_000;

/// Binds all values of a parameter as `Vec<T>`.
///
/// Repeated keys (`id=1&id=2`) are used when present. Otherwise indexed keys
/// (`id[0]=1&id[2]=3`) fill a vector sized to the highest index, with gaps left
/// at the zero value. Indices of [`MAX_SLICE_INDEX`] or more are dropped with
/// a warning.
pub struct SeqBinder<T>(PhantomData<fn() -> T>);

impl<T> SeqBinder<T> {
    /// Creates the binder.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromParam> Binder for SeqBinder<T> {
    fn bind(&self, params: &mut Params, name: &str) -> BoundValue {
        let plain = params.get_all(name);
        if !plain.is_empty() {
            let values: Vec<T> = plain
                .iter()
                .map(|value| T::from_param(value).unwrap_or_default())
                .collect();
            return Box::new(values);
        }

        let prefix = format!("{name}[");
        let mut indexed: Vec<(usize, &str)> = Vec::new();
        for (key, values) in params.values() {
            let Some(raw_index) = key.strip_prefix(&prefix).and_then(|k| k.strip_suffix(']')) else {
                continue;
            };
            let Some(value) = values.first() else {
                continue;
            };
            match raw_index.parse::<usize>() {
                Ok(index) if index < MAX_SLICE_INDEX => indexed.push((index, value.as_str())),
                _ => tracing::warn!(
                    param = name,
                    key = %key,
                    max_index = MAX_SLICE_INDEX,
                    "ignoring out-of-range slice index"
                ),
            }
        }

        let len = indexed
            .iter()
            .filter_map(|(index, _)| index.checked_add(1))
            .max()
            .unwrap_or(0);
        let mut values: Vec<T> = std::iter::repeat_with(T::default).take(len).collect();
        for (index, raw) in indexed {
            if let Some(slot) = values.get_mut(index) {
                *slot = T::from_param(raw).unwrap_or_default();
            }
        }
        Box::new(values)
    }
}

/// Binds a parameter as `Option<T>`: `None` when absent or unparsable.
pub struct OptionBinder<T>(PhantomData<fn() -> T>);

impl<T> OptionBinder<T> {
    /// Creates the binder.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: FromParam> Binder for OptionBinder<T> {
    fn bind(&self, params: &mut Params, name: &str) -> BoundValue {
        let value: Option<T> = params.get(name).and_then(T::from_param);
        Box::new(value)
    }
}

fn first_upload(params: &Params, name: &str) -> Option<Upload> {
    params.files().get(name).and_then(|files| files.first()).cloned()
}

fn bind_upload(params: &mut Params, name: &str) -> BoundValue {
    Box::new(first_upload(params, name).unwrap_or_default())
}

fn bind_optional_upload(params: &mut Params, name: &str) -> BoundValue {
    Box::new(first_upload(params, name))
}

fn bind_uploads(params: &mut Params, name: &str) -> BoundValue {
    let files: Vec<Upload> = params.files().get(name).cloned().unwrap_or_default();
    Box::new(files)
}

fn bind_upload_bytes(params: &mut Params, name: &str) -> BoundValue {
    let bytes = first_upload(params, name)
        .map(|upload| {
            upload.bytes().unwrap_or_else(|err| {
                tracing::warn!(param = name, error = %err, "failed to read uploaded file");
                Bytes::new()
            })
        })
        .unwrap_or_default();
    Box::new(bytes)
}

/// Binds an upload as a path on disk.
///
/// Spilled uploads bind to their existing file. In-memory uploads are written
/// to a new temporary file that is removed when the request ends.
fn bind_upload_path(params: &mut Params, name: &str) -> BoundValue {
    let Some(upload) = first_upload(params, name) else {
        return Box::new(PathBuf::new());
    };
    let path = match upload.storage() {
        Storage::Disk(path) => path.clone(),
        Storage::Memory(data) => match write_temp_file(data) {
            Ok(path) => {
                params.track_temp_file(path.clone());
                path
            }
            Err(err) => {
                tracing::warn!(param = name, error = %err, "failed to materialize upload");
                PathBuf::new()
            }
        },
    };
    Box::new(path)
}

fn write_temp_file(data: &[u8]) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("meridian-bind-")
        .tempfile()?;
    file.write_all(data)?;
    file.into_temp_path().keep().map_err(|err| err.error)
}

/// Registry from [`TypeTag`] to [`Binder`].
///
/// `Binders::default()` registers the built-in binders:
///
/// - every integer and float type, `bool`, `char` and `String`, each also as
///   `Vec<T>` and `Option<T>`
/// - [`Upload`], `Option<Upload>` and `Vec<Upload>`
/// - [`Bytes`] (the first upload's content)
/// - [`PathBuf`] (the first upload as a file on disk)
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use meridian_extract::{Binders, BoundValue, Params, Values};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Slug(String);
///
/// let mut binders = Binders::default();
/// binders.register::<Slug>(|params: &mut Params, name: &str| -> BoundValue {
///     Box::new(Slug(params.get(name).unwrap_or_default().to_lowercase()))
/// });
///
/// let mut params = Params::new(Arc::new(binders));
/// params.set_route(Values::from([("slug".to_string(), vec!["Hello".to_string()])]));
///
/// let mut slug = Slug::default();
/// params.bind(&mut slug, "slug");
/// assert_eq!(slug, Slug("hello".into()));
/// ```
#[derive(Clone)]
pub struct Binders {
    binders: HashMap<TypeId, Arc<dyn Binder>>,
}

impl Binders {
    /// Creates a registry with no binders.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binders: HashMap::new(),
        }
    }

    /// Registers `binder` for type `T`, replacing any previous binder.
    pub fn register<T: 'static>(&mut self, binder: impl Binder) -> &mut Self {
        self.binders.insert(TypeId::of::<T>(), Arc::new(binder));
        self
    }

    /// Registers `T`, `Vec<T>` and `Option<T>` for a [`FromParam`] type.
    pub fn register_value<T: FromParam>(&mut self) -> &mut Self {
        self.register::<T>(ValueBinder::<T>::new())
            .register::<Vec<T>>(SeqBinder::<T>::new())
            .register::<Option<T>>(OptionBinder::<T>::new())
    }

    /// Returns the binder for `tag`.
    #[must_use]
    pub fn get(&self, tag: TypeTag) -> Option<&Arc<dyn Binder>> {
        self.binders.get(&tag.id())
    }

    /// Returns `true` if `T` has a binder.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.binders.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.binders.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }
}

impl Default for Binders {
    fn default() -> Self {
        let mut binders = Self::new();
        binders
            .register_value::<i8>()
            .register_value::<i16>()
            .register_value::<i32>()
            .register_value::<i64>()
            .register_value::<i128>()
            .register_value::<isize>()
            .register_value::<u8>()
            .register_value::<u16>()
            .register_value::<u32>()
            .register_value::<u64>()
            .register_value::<u128>()
            .register_value::<usize>()
            .register_value::<f32>()
            .register_value::<f64>()
            .register_value::<bool>()
            .register_value::<char>()
            .register_value::<String>()
            .register::<Upload>(bind_upload)
            .register::<Option<Upload>>(bind_optional_upload)
            .register::<Vec<Upload>>(bind_uploads)
            .register::<Bytes>(bind_upload_bytes)
            .register::<PathBuf>(bind_upload_path);
        binders
    }
}

impl fmt::Debug for Binders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binders")
            .field("types", &self.binders.len())
            .finish()
    }
}
