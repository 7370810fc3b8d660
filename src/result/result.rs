use crate::core::{BindError, Result, Value};

pub type Row = Vec<Value>;

/// Rows returned by a handle for a read statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Convenience constructor for handles and tests.
    pub fn from_rows(columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }
}

/// Outcome of an insert or execute statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identity generated by the statement, when the driver reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub fn new(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            last_insert_id,
        }
    }
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn value(&self, index: usize) -> Result<&'a Value> {
        self.values
            .get(index)
            .ok_or_else(|| BindError::Decode(format!("row has no column at index {index}")))
    }

    pub fn get(&self, column: &str) -> Result<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| BindError::Decode(format!("column '{column}' not found in row")))
    }

    pub fn get_as<T: super::FromValue>(&self, column: &str) -> Result<T> {
        let value = self.get(column)?;
        T::from_value(value).map_err(|e| match e {
            BindError::Decode(msg) => BindError::Decode(format!("column '{column}': {msg}")),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_by_name() {
        let result = QueryResult::from_rows(
            &["id", "name"],
            vec![vec![Value::Integer(1), Value::from("foo")]],
        );
        let row = result.row(0).unwrap();
        assert_eq!(row.get("name").unwrap(), &Value::from("foo"));
        assert_eq!(row.get_as::<i64>("id").unwrap(), 1);
        assert!(row.get("missing").is_err());
        assert!(result.row(1).is_none());
    }
}
