//! Binding of mapped structs to their statements.

mod args;
mod config;
mod mapper;
mod operation;

pub use args::{Arguments, Param};
pub use config::BinderConfig;
pub use mapper::{CacheField, Mapper, OperationSlot, OperationVisitor};
pub use operation::Op;

use crate::cache::QueryCache;
use crate::core::{BindError, Result, Value};
use crate::executor::build_scope;
use crate::storage::{Catalog, DefinitionSource, DefinitionStore};
use crate::template::{BindContext, FnFunction, FunctionRegistry, RenderedQuery, Template, TemplateFunction};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Binds [`Mapper`] structs to the statements of a [`DefinitionStore`].
///
/// # Examples
///
/// ```ignore
/// let mut binder = Binder::new().with_cache(Arc::new(MemoryCache::new()));
/// binder.scan_dir("sql")?;
///
/// let mut dao = UserDao { db: handle, ..Default::default() };
/// binder.map(&mut dao)?;
/// let users = dao.find_by_name.call(("bar".to_string(),)).await?;
/// ```
pub struct Binder {
    store: DefinitionStore,
    functions: Arc<FunctionRegistry>,
    config: BinderConfig,
    cache: Option<Arc<dyn QueryCache>>,
}

impl Binder {
    pub fn new() -> Self {
        Self::with_config(BinderConfig::default())
    }

    pub fn with_config(config: BinderConfig) -> Self {
        Self {
            store: DefinitionStore::new(),
            functions: Arc::new(FunctionRegistry::with_default_functions()),
            config,
            cache: None,
        }
    }

    /// Cache backend for structs with a `cache` field.
    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn store(&self) -> &DefinitionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DefinitionStore {
        &mut self.store
    }

    pub fn add_source(&mut self, source: DefinitionSource) {
        self.store.add_source(source);
    }

    pub fn add_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = DefinitionSource>,
    {
        self.store.add_sources(sources);
    }

    pub fn load_json(&mut self, text: &str) -> Result<usize> {
        self.store.load_json(text)
    }

    pub fn scan_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        self.store.scan_dir(dir)
    }

    /// Make `f` callable from templates as `name`, replacing any function
    /// already registered under that name. Operations bound earlier keep
    /// the functions they were bound with.
    pub fn add_function<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut BindContext, &Value) -> Result<String> + Send + Sync + 'static,
    {
        self.register_function(Arc::new(FnFunction::new(name, f)));
    }

    pub fn register_function(&mut self, function: Arc<dyn TemplateFunction>) {
        Arc::make_mut(&mut self.functions).register(function);
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn index(&mut self) -> Result<&Catalog> {
        self.store.index()
    }

    /// Bind every operation field of `target`.
    ///
    /// Either every field is bound or, on error, `target` is left as it was.
    /// When `target` has a `cache` field it receives a second instance whose
    /// read operations go through the cache backend.
    pub fn map<T: Mapper>(&mut self, target: &mut T) -> Result<()> {
        let catalog = self.store.index()?.clone();
        let owner = catalog
            .resolve(T::package(), T::type_name())
            .ok_or_else(|| BindError::UnmappedType(qualified_name::<T>()))?;
        let handle = target
            .handle()
            .ok_or_else(|| BindError::MissingHandle(qualified_name::<T>()))?;

        let mut planner = OperationVisitor::plan(owner, &self.functions, &self.config);
        target.visit_operations(&mut planner)?;
        let planned = planner.into_planned();

        let cached = match target.cache_field() {
            CacheField::Absent => None,
            CacheField::Mistyped(found) => {
                return Err(BindError::BadCacheField {
                    type_name: T::type_name().to_string(),
                    found: found.to_string(),
                });
            }
            CacheField::Slot(_) => {
                let backend = self
                    .cache
                    .clone()
                    .ok_or_else(|| BindError::CacheUnavailable(qualified_name::<T>()))?;
                let mut instance = T::with_handle(Arc::clone(&handle));
                let mut committer = OperationVisitor::commit(
                    owner,
                    &self.functions,
                    &self.config,
                    planned.clone(),
                    Arc::clone(&handle),
                    Some(backend),
                );
                instance.visit_operations(&mut committer)?;
                Some(instance)
            }
        };

        let operations = planned.len();
        let mut committer =
            OperationVisitor::commit(owner, &self.functions, &self.config, planned, handle, None);
        target.visit_operations(&mut committer)?;

        if let Some(instance) = cached {
            if let CacheField::Slot(slot) = target.cache_field() {
                *slot = Some(Box::new(instance));
            }
        }

        debug!(
            owner = %owner.owner_key,
            operations,
            cached = self.cache.is_some(),
            "bound mapper"
        );
        Ok(())
    }

    /// Render one statement without a struct or database. The `fields`
    /// variable is empty since no return type is known.
    pub fn render(
        &mut self,
        owner_key: &str,
        statement: &str,
        args: Vec<Value>,
    ) -> Result<RenderedQuery> {
        let config = self.config.clone();
        let functions = Arc::clone(&self.functions);
        let catalog = self.store.index()?;

        let owner = catalog
            .get(owner_key)
            .ok_or_else(|| BindError::UnmappedType(owner_key.to_string()))?;
        let definition = owner
            .statement(statement)
            .ok_or_else(|| BindError::UnmappedOperation {
                owner: owner_key.to_string(),
                operation: statement.to_string(),
            })?;
        if definition.arity() != args.len() {
            return Err(BindError::ArityMismatch {
                operation: statement.to_string(),
                declared: args.len(),
                defined: definition.arity(),
            });
        }

        let template = Template::compile(&definition.name, &definition.template, &functions)?;
        let scope = build_scope(&definition.arg_names, args, &owner.table, "");
        template.render(&scope, &functions, config.placeholder)
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

fn qualified_name<T: Mapper>() -> String {
    if T::package().is_empty() {
        T::type_name().to_string()
    } else {
        format!("{}.{}", T::package(), T::type_name())
    }
}
