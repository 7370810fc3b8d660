use crate::core::{BindError, Result, StatementKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// File suffix picked up by [`read_dir`].
pub const SOURCE_SUFFIX: &str = ".sql.json";

/// One raw definition record, as produced by a source file.
///
/// ```json
/// { "package": "app::dao", "type": "User", "table": "user",
///   "selects": [{ "name": "FindByName", "args": "name",
///                 "body": "select {{.fields}} from {{.table}} where name = {{arg .name}}" }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionSource {
    pub package: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub table: String,
    pub selects: Vec<StatementSource>,
    pub executes: Vec<StatementSource>,
    pub inserts: Vec<StatementSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementSource {
    pub name: String,
    /// Comma-separated argument names, e.g. `"name, age"`
    pub args: String,
    #[serde(alias = "sql")]
    pub body: String,
}

impl StatementSource {
    pub fn new(name: &str, args: &str, body: &str) -> Self {
        Self {
            name: name.to_string(),
            args: args.to_string(),
            body: body.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<DefinitionSource>),
    One(DefinitionSource),
}

impl DefinitionSource {
    pub fn new(package: &str, type_name: &str, table: &str) -> Self {
        Self {
            package: package.to_string(),
            type_name: type_name.to_string(),
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn select(mut self, name: &str, args: &str, body: &str) -> Self {
        self.selects.push(StatementSource::new(name, args, body));
        self
    }

    pub fn insert(mut self, name: &str, args: &str, body: &str) -> Self {
        self.inserts.push(StatementSource::new(name, args, body));
        self
    }

    pub fn execute(mut self, name: &str, args: &str, body: &str) -> Self {
        self.executes.push(StatementSource::new(name, args, body));
        self
    }

    /// `package.type`, or the bare type when no package is given.
    pub fn owner_key(&self) -> String {
        if self.package.is_empty() {
            self.type_name.clone()
        } else {
            format!("{}.{}", self.package, self.type_name)
        }
    }

    /// Statements in merge order: selects, executes, inserts.
    pub fn statements(&self) -> impl Iterator<Item = (StatementKind, &StatementSource)> {
        let selects = self.selects.iter().map(|s| (StatementKind::Read, s));
        let executes = self.executes.iter().map(|s| (StatementKind::Execute, s));
        let inserts = self.inserts.iter().map(|s| (StatementKind::Insert, s));
        selects.chain(executes).chain(inserts)
    }

    /// Parse a JSON document holding one record or an array of records.
    pub fn from_json(text: &str) -> Result<Vec<Self>> {
        let parsed: OneOrMany =
            serde_json::from_str(text).map_err(|e| BindError::SourceRead(e.to_string()))?;
        let sources = match parsed {
            OneOrMany::One(source) => vec![source],
            OneOrMany::Many(sources) => sources,
        };
        if let Some(nameless) = sources.iter().find(|s| s.type_name.is_empty()) {
            return Err(BindError::SourceRead(format!(
                "definition for table '{}' has no type",
                nameless.table
            )));
        }
        Ok(sources)
    }
}

/// Read every `*.sql.json` file of a directory, in file-name order.
pub fn read_dir(dir: &Path) -> Result<Vec<DefinitionSource>> {
    let read_error = |e: std::io::Error| BindError::SourceRead(format!("{}: {e}", dir.display()));

    let metadata = std::fs::metadata(dir).map_err(read_error)?;
    if !metadata.is_dir() {
        return Err(BindError::SourceRead(format!("{} is not a directory", dir.display())));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        let is_source = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SOURCE_SUFFIX));
        if is_source && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sources = Vec::new();
    for path in paths {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| BindError::SourceRead(format!("{}: {e}", path.display())))?;
        let parsed = DefinitionSource::from_json(&text).map_err(|e| match e {
            BindError::SourceRead(msg) => BindError::SourceRead(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), records = parsed.len(), "read definition source");
        sources.extend(parsed);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_key() {
        assert_eq!(DefinitionSource::new("", "User", "user").owner_key(), "User");
        assert_eq!(DefinitionSource::new("app::dao", "User", "user").owner_key(), "app::dao.User");
    }

    #[test]
    fn test_statement_order() {
        let source = DefinitionSource::new("", "User", "user")
            .insert("Create", "u", "insert")
            .execute("Delete", "id", "delete")
            .select("Find", "id", "select");
        let kinds: Vec<_> = source.statements().map(|(kind, s)| (kind, s.name.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (StatementKind::Read, "Find"),
                (StatementKind::Execute, "Delete"),
                (StatementKind::Insert, "Create"),
            ]
        );
    }

    #[test]
    fn test_from_json_single_and_array() {
        let one = DefinitionSource::from_json(
            r#"{"type": "User", "table": "user", "selects": [{"name": "FindAll", "sql": "select 1"}]}"#,
        )
        .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].selects[0].body, "select 1");
        assert_eq!(one[0].package, "");

        let many = DefinitionSource::from_json(r#"[{"type": "A"}, {"type": "B"}]"#).unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            DefinitionSource::from_json("<statements/>"),
            Err(BindError::SourceRead(_))
        ));
        assert!(matches!(
            DefinitionSource::from_json(r#"{"table": "user"}"#),
            Err(BindError::SourceRead(_))
        ));
    }
}
