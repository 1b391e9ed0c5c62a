//! The unified parameter view.
//!
//! [`Params`] collects the four string sources a request can carry and keeps a
//! merged view of them:
//!
//! | Source | Filled by |
//! |--------|-----------|
//! | fixed  | the router, from literal route arguments |
//! | route  | the router, from path segments |
//! | query  | [`parse_params`](crate::parse_params), from the URL |
//! | form   | [`parse_params`](crate::parse_params), from the body |
//!
//! The merged view walks the sources in the order fixed, query, route, form.
//! Values for a key that appears in several sources accumulate in that order;
//! nothing is overwritten. When only one source holds anything, the merged view
//! shares that source's map instead of copying it.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use meridian_core::contract_violation;

use crate::binder::{Binders, BoundValue, TypeTag};
use crate::upload::Upload;

/// Parameter name to ordered values.
pub type Values = HashMap<String, Vec<String>>;

/// Per-request parameters.
pub struct Params {
    values: Arc<Values>,
    fixed: Arc<Values>,
    route: Arc<Values>,
    query: Arc<Values>,
    form: Arc<Values>,
    files: HashMap<String, Vec<Upload>>,
    multipart_files: Vec<PathBuf>,
    tmp_files: Vec<PathBuf>,
    binders: Arc<Binders>,
}

impl Params {
    /// Creates empty parameters that bind through `binders`.
    #[must_use]
    pub fn new(binders: Arc<Binders>) -> Self {
        Self {
            values: Arc::default(),
            fixed: Arc::default(),
            route: Arc::default(),
            query: Arc::default(),
            form: Arc::default(),
            files: HashMap::new(),
            multipart_files: Vec::new(),
            tmp_files: Vec::new(),
            binders,
        }
    }

    /// Replaces the fixed (route-literal) source.
    pub fn set_fixed(&mut self, values: Values) {
        self.fixed = Arc::new(values);
        self.unify();
    }

    /// Replaces the path-extracted source.
    pub fn set_route(&mut self, values: Values) {
        self.route = Arc::new(values);
        self.unify();
    }

    /// Replaces the query-string source.
    pub fn set_query(&mut self, values: Values) {
        self.query = Arc::new(values);
        self.unify();
    }

    /// Replaces the body source.
    pub fn set_form(&mut self, values: Values) {
        self.form = Arc::new(values);
        self.unify();
    }

    fn unify(&mut self) {
        let sources = [&self.fixed, &self.query, &self.route, &self.form];
        let total: usize = sources.iter().map(|source| source.len()).sum();

        self.values = if total == 0 {
            Arc::default()
        } else if let Some(only) = sources.iter().find(|source| source.len() == total) {
            Arc::clone(only)
        } else {
            let mut merged = Values::with_capacity(total);
            for source in sources {
                for (key, values) in source.iter() {
                    merged
                        .entry(key.clone())
                        .or_default()
                        .extend(values.iter().cloned());
                }
            }
            Arc::new(merged)
        };
    }

    /// Returns the merged view.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Returns the fixed source.
    pub fn fixed(&self) -> &Values {
        &self.fixed
    }

    /// Returns the route source.
    pub fn route(&self) -> &Values {
        &self.route
    }

    /// Returns the query source.
    pub fn query(&self) -> &Values {
        &self.query
    }

    /// Returns the form source.
    pub fn form(&self) -> &Values {
        &self.form
    }

    /// Returns the first merged value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every merged value for `name`.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Returns uploaded file parts by field name.
    pub fn files(&self) -> &HashMap<String, Vec<Upload>> {
        &self.files
    }

    /// Records uploaded parts and the spill files backing them.
    pub fn set_files(&mut self, files: HashMap<String, Vec<Upload>>, spilled: Vec<PathBuf>) {
        self.files = files;
        self.multipart_files.extend(spilled);
    }

    /// Tracks a temporary file for removal when the request ends.
    pub fn track_temp_file(&mut self, path: PathBuf) {
        self.tmp_files.push(path);
    }

    /// Returns the registry used by [`bind`](Self::bind).
    pub fn binders(&self) -> &Arc<Binders> {
        &self.binders
    }

    /// Binds the parameter `name` into `dest`.
    ///
    /// Unparsable or missing values leave the type's zero value in `dest`.
    /// Binding a type with no registered binder is a contract violation.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use meridian_extract::{Binders, Params, Values};
    ///
    /// let mut params = Params::new(Arc::new(Binders::default()));
    /// params.set_query(Values::from([("page".to_string(), vec!["3".to_string()])]));
    ///
    /// let mut page = 0_u32;
    /// params.bind(&mut page, "page");
    /// assert_eq!(page, 3);
    ///
    /// let mut missing = 7_i64;
    /// params.bind(&mut missing, "missing");
    /// assert_eq!(missing, 0);
    /// ```
    pub fn bind<T: 'static>(&mut self, dest: &mut T, name: &str) {
        let value = self.bind_value(name, TypeTag::of::<T>());
        match value.downcast::<T>() {
            Ok(value) => *dest = *value,
            Err(_) => contract_violation(format!(
                "binder for {} returned a value of another type",
                type_name::<T>()
            )),
        }
    }

    /// Binds the parameter `name` as the type identified by `tag`.
    pub fn bind_value(&mut self, name: &str, tag: TypeTag) -> BoundValue {
        let binders = Arc::clone(&self.binders);
        match binders.get(tag) {
            Some(binder) => binder.bind(self, name),
            None => contract_violation(format!("no binder registered for type {}", tag.name())),
        }
    }

    /// Removes spilled uploads and tracked temporary files.
    ///
    /// Removal failures are logged, never returned.
    pub fn cleanup(&mut self) {
        for path in self.multipart_files.drain(..).chain(self.tmp_files.drain(..)) {
            if let Err(err) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove temporary file");
            }
        }
    }

    /// Returns the number of files [`cleanup`](Self::cleanup) will remove.
    pub fn pending_cleanup(&self) -> usize {
        self.multipart_files.len() + self.tmp_files.len()
    }
}

impl Drop for Params {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("values", &self.values)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("pending_cleanup", &self.pending_cleanup())
            .finish_non_exhaustive()
    }
}
