use super::config::BinderConfig;
use crate::cache::{QueryCache, cache_scope};
use crate::core::{BindError, Result, StatementKind};
use crate::executor::BoundOperation;
use crate::interface::Db;
use crate::result::ReturnShape;
use crate::storage::{EntityDefinitionSet, StatementDefinition};
use crate::template::{FunctionRegistry, Template};
use std::sync::Arc;

/// A struct whose operation fields get bound to statements.
///
/// Normally derived with `#[derive(Mapper)]`:
///
/// ```ignore
/// #[derive(Mapper)]
/// struct UserDao {
///     db: Db,
///     #[sqlbind(name = "FindByName")]
///     find_by_name: Op<(String,), Vec<User>>,
///     cache: Option<Box<UserDao>>,
/// }
/// ```
pub trait Mapper: Sized {
    /// Package half of the owner key. Empty for bare type lookups.
    fn package() -> &'static str;

    fn type_name() -> &'static str;

    /// The handle stored in the `db` field.
    fn handle(&self) -> Option<Db>;

    /// A fresh instance sharing only `db`; every operation field unbound.
    fn with_handle(db: Db) -> Self;

    /// Call `visitor.visit` once per operation field, in declaration order.
    fn visit_operations(&mut self, visitor: &mut OperationVisitor<'_>) -> Result<()>;

    fn cache_field(&mut self) -> CacheField<'_, Self>;
}

/// The `cache` field of a mapped struct.
pub enum CacheField<'a, T> {
    /// No field named `cache`
    Absent,
    Slot(&'a mut Option<Box<T>>),
    /// A `cache` field of the wrong type; carries the type as written
    Mistyped(&'static str),
}

/// What the binder needs to know about one operation field.
/// Implemented by [`Op`](super::Op).
pub trait OperationSlot {
    fn arity(&self) -> usize;

    fn shape(&self) -> ReturnShape;

    fn accepts(&self, kind: StatementKind) -> bool;

    /// Columns of the primary return value's record type.
    fn columns(&self) -> Vec<&'static str>;

    /// Declared return type, for error messages.
    fn return_type(&self) -> &'static str;

    fn install(&mut self, operation: Arc<BoundOperation>);
}

/// Statement and compiled template checked against one operation field.
#[derive(Debug, Clone)]
pub(crate) struct PlannedOperation {
    statement: Arc<StatementDefinition>,
    template: Arc<Template>,
    fields: String,
}

enum Pass {
    Plan(Vec<PlannedOperation>),
    Commit {
        planned: Vec<PlannedOperation>,
        next: usize,
        handle: Db,
        cache: Option<Arc<dyn QueryCache>>,
    },
}

/// Walks the operation fields of a [`Mapper`] twice: once to check every
/// field and compile its template, once to install the results. Nothing is
/// written before the first walk has fully succeeded.
pub struct OperationVisitor<'a> {
    owner: &'a EntityDefinitionSet,
    functions: &'a Arc<FunctionRegistry>,
    config: &'a BinderConfig,
    pass: Pass,
}

impl<'a> OperationVisitor<'a> {
    pub(crate) fn plan(
        owner: &'a EntityDefinitionSet,
        functions: &'a Arc<FunctionRegistry>,
        config: &'a BinderConfig,
    ) -> Self {
        Self {
            owner,
            functions,
            config,
            pass: Pass::Plan(Vec::new()),
        }
    }

    pub(crate) fn commit(
        owner: &'a EntityDefinitionSet,
        functions: &'a Arc<FunctionRegistry>,
        config: &'a BinderConfig,
        planned: Vec<PlannedOperation>,
        handle: Db,
        cache: Option<Arc<dyn QueryCache>>,
    ) -> Self {
        Self {
            owner,
            functions,
            config,
            pass: Pass::Commit {
                planned,
                next: 0,
                handle,
                cache,
            },
        }
    }

    /// Operations checked so far by a planning walk.
    pub(crate) fn into_planned(self) -> Vec<PlannedOperation> {
        match self.pass {
            Pass::Plan(planned) => planned,
            Pass::Commit { planned, .. } => planned,
        }
    }

    /// Visit the operation field bound to the statement `name`.
    pub fn visit(&mut self, name: &str, slot: &mut dyn OperationSlot) -> Result<()> {
        match &mut self.pass {
            Pass::Plan(planned) => {
                planned.push(plan_operation(self.owner, self.functions, name, slot)?);
                Ok(())
            }
            Pass::Commit {
                planned,
                next,
                handle,
                cache,
            } => {
                let plan = planned
                    .get(*next)
                    .filter(|plan| plan.statement.name == name)
                    .ok_or_else(|| {
                        BindError::Unbound(format!(
                            "{}.{name}: operation fields changed between binding passes",
                            self.owner.owner_key
                        ))
                    })?;
                *next += 1;

                let cache = match plan.statement.kind {
                    StatementKind::Read => cache.clone(),
                    _ => None,
                };
                slot.install(Arc::new(BoundOperation {
                    owner_key: self.owner.owner_key.clone(),
                    table: self.owner.table.clone(),
                    fields: plan.fields.clone(),
                    statement: Arc::clone(&plan.statement),
                    template: Arc::clone(&plan.template),
                    handle: Arc::clone(handle),
                    functions: Arc::clone(self.functions),
                    config: self.config.clone(),
                    cache_scope: cache_scope(&self.owner.owner_key, name),
                    cache,
                }));
                Ok(())
            }
        }
    }
}

fn plan_operation(
    owner: &EntityDefinitionSet,
    functions: &FunctionRegistry,
    name: &str,
    slot: &dyn OperationSlot,
) -> Result<PlannedOperation> {
    let statement = owner
        .statement(name)
        .ok_or_else(|| BindError::UnmappedOperation {
            owner: owner.owner_key.clone(),
            operation: name.to_string(),
        })?;

    if statement.arity() != slot.arity() {
        return Err(BindError::ArityMismatch {
            operation: name.to_string(),
            declared: slot.arity(),
            defined: statement.arity(),
        });
    }

    if !slot.accepts(statement.kind) {
        return Err(BindError::ShapeMismatch {
            operation: name.to_string(),
            shape: slot.return_type().to_string(),
            kind: statement.kind,
        });
    }

    let template = Template::compile(&statement.name, &statement.template, functions)?;

    Ok(PlannedOperation {
        statement: Arc::clone(statement),
        template: Arc::new(template),
        fields: field_list(&slot.columns()),
    })
}

/// `` `a`,`b`,`c` ``
pub(crate) fn field_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|column| format!("`{column}`"))
        .collect::<Vec<_>>()
        .join(",")
}
