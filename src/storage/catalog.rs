use super::source::DefinitionSource;
use crate::core::{BindError, Result, StatementKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One named statement of an entity. Immutable once the index is built.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDefinition {
    pub name: String,
    pub kind: StatementKind,
    /// Template body, trimmed of surrounding whitespace
    pub template: String,
    pub arg_names: Vec<String>,
}

impl StatementDefinition {
    pub fn new(name: &str, kind: StatementKind, template: &str, args: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            template: template.trim().to_string(),
            arg_names: split_args(args),
        }
    }

    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

/// Split an argument declaration such as `"name, age,"` into `["name", "age"]`.
pub fn split_args(declaration: &str) -> Vec<String> {
    declaration
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// All statements mapped to one owner key, merged across sources.
#[derive(Debug, Clone, Default)]
pub struct EntityDefinitionSet {
    pub owner_key: String,
    pub package: String,
    pub type_name: String,
    pub table: String,
    statements: BTreeMap<String, Arc<StatementDefinition>>,
}

impl EntityDefinitionSet {
    fn new(source: &DefinitionSource) -> Self {
        Self {
            owner_key: source.owner_key(),
            package: source.package.clone(),
            type_name: source.type_name.clone(),
            table: String::new(),
            statements: BTreeMap::new(),
        }
    }

    pub fn statement(&self, name: &str) -> Option<&Arc<StatementDefinition>> {
        self.statements.get(name)
    }

    /// Statements in name order.
    pub fn statements(&self) -> impl Iterator<Item = &Arc<StatementDefinition>> {
        self.statements.values()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Merge raw sources into one definition set per owner key.
///
/// Sources apply in order and a later statement replaces an earlier one of
/// the same name. Two non-empty table names for one owner key are a
/// [`BindError::DefinitionConflict`]; an empty table name never conflicts.
pub fn merge(sources: &[DefinitionSource]) -> Result<BTreeMap<String, EntityDefinitionSet>> {
    let mut sets: BTreeMap<String, EntityDefinitionSet> = BTreeMap::new();

    for source in sources {
        let set = sets
            .entry(source.owner_key())
            .or_insert_with(|| EntityDefinitionSet::new(source));

        if !source.table.is_empty() {
            if set.table.is_empty() {
                set.table = source.table.clone();
            } else if set.table != source.table {
                return Err(BindError::DefinitionConflict {
                    owner: set.owner_key.clone(),
                    existing: set.table.clone(),
                    incoming: source.table.clone(),
                });
            }
        }

        for (kind, statement) in source.statements() {
            let definition =
                StatementDefinition::new(&statement.name, kind, &statement.body, &statement.args);
            set.statements
                .insert(statement.name.clone(), Arc::new(definition));
        }
    }

    Ok(sets)
}

/// Frozen index of definition sets.
/// Cloning is cheap: the map sits behind an `Arc` and is never mutated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    sets: Arc<HashMap<String, Arc<EntityDefinitionSet>>>,
}

impl Catalog {
    pub fn new(sets: BTreeMap<String, EntityDefinitionSet>) -> Self {
        let sets = sets
            .into_iter()
            .map(|(key, set)| (key, Arc::new(set)))
            .collect();
        Self {
            sets: Arc::new(sets),
        }
    }

    pub fn get(&self, owner_key: &str) -> Option<&Arc<EntityDefinitionSet>> {
        self.sets.get(owner_key)
    }

    /// Look up `package.type` first, then the bare type name.
    pub fn resolve(&self, package: &str, type_name: &str) -> Option<&Arc<EntityDefinitionSet>> {
        if !package.is_empty() {
            if let Some(set) = self.sets.get(&format!("{package}.{type_name}")) {
                return Some(set);
            }
        }
        self.sets.get(type_name)
    }

    /// Owner keys in sorted order.
    pub fn owners(&self) -> Vec<&str> {
        let mut owners: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        owners.sort_unstable();
        owners
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub(crate) fn shares_index_with(&self, other: &Catalog) -> bool {
        Arc::ptr_eq(&self.sets, &other.sets)
    }
}
