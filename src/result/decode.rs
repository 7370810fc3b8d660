//! Decoding of result rows into the return shape an operation declares.
//!
//! The primary return shape decides how a read is issued and decoded:
//!
//! | declared type | shape       | zero rows                 |
//! |---------------|-------------|---------------------------|
//! | `Vec<T>`      | sequence    | empty vector              |
//! | `Box<T>`      | reference   | [`BindError::NoRows`]     |
//! | `T`           | value       | [`BindError::NoRows`]     |
//! | `Option<S>`   | exists flag | `None`                    |
//!
//! Insert and execute statements return the affected-row count, so they
//! accept integer shapes (coerced to the declared width) and `()`.

use super::{QueryResult, RowRef};
use crate::core::{BindError, Result, StatementKind, Value};

/// Conversion of a single column value into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(BindError::Decode(format!(
        "expected {expected}, found {} ({value})",
        value.type_name()
    )))
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    let Some(i) = value.as_i64() else {
                        return mismatch(stringify!($ty), value);
                    };
                    <$ty>::try_from(i).map_err(|_| {
                        BindError::Decode(format!("{i} does not fit in {}", stringify!($ty)))
                    })
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch("f64", value), Ok)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch("f32", value), |f| Ok(f as f32))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("text", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Decoding of one whole row. Records decode by column name, scalars take
/// the first column.
pub trait FromRow: Sized {
    fn from_row(row: &RowRef<'_>) -> Result<Self>;
}

/// A struct mapped to table columns. Usually derived with `#[derive(Record)]`.
pub trait Record: FromRow + Send + 'static {
    /// Column names, in declaration order. They feed the `fields` template
    /// variable of operations returning this record.
    fn columns() -> Vec<&'static str>;

    /// Template-side view of the record, keyed by field name.
    fn to_value(&self) -> Value;

    /// Store a generated identity in the record's identity field. Returns
    /// `false` when the record has no identity field or the id does not fit.
    fn assign_identity(&mut self, _id: i64) -> bool {
        false
    }
}

/// Shape of an operation's primary return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Multi-row query decoded into a fresh vector
    Sequence,
    /// Single-row query decoded into a new allocation
    Reference,
    /// Single-row query decoded directly
    Value,
    /// `Option<_>` around a single-row shape: zero rows is not an error
    Optional,
    /// Nothing but the error
    Unit,
}

/// A type an operation can return.
///
/// `Clone` is what the cache decorator uses to hand out independent copies.
pub trait Output: Clone + Send + Sync + Sized + 'static {
    fn shape() -> ReturnShape;

    /// Columns backing the `fields` template variable.
    fn columns() -> Vec<&'static str> {
        Vec::new()
    }

    /// Decode the rows of a read statement.
    fn decode(result: QueryResult) -> Result<Self>;

    /// Convert the affected-row count of an insert/execute statement.
    fn from_affected(affected: u64) -> Result<Self> {
        Err(BindError::Decode(format!(
            "{} cannot hold an affected-row count ({affected})",
            std::any::type_name::<Self>()
        )))
    }

    fn accepts(kind: StatementKind) -> bool {
        kind == StatementKind::Read
    }
}

/// First row of `result`, or [`BindError::NoRows`].
pub fn decode_one<T: FromRow>(result: &QueryResult) -> Result<T> {
    let row = result.row(0).ok_or(BindError::NoRows)?;
    T::from_row(&row)
}

pub fn decode_all<T: FromRow>(result: &QueryResult) -> Result<Vec<T>> {
    result.iter().map(|row| T::from_row(&row)).collect()
}

macro_rules! scalar_output {
    ($($ty:ty),*) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &RowRef<'_>) -> Result<Self> {
                    <$ty as FromValue>::from_value(row.value(0)?)
                }
            }

            impl Output for $ty {
                fn shape() -> ReturnShape {
                    ReturnShape::Value
                }

                fn decode(result: QueryResult) -> Result<Self> {
                    decode_one(&result)
                }
            }
        )*
    };
}

macro_rules! count_output {
    ($($ty:ty),*) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &RowRef<'_>) -> Result<Self> {
                    <$ty as FromValue>::from_value(row.value(0)?)
                }
            }

            impl Output for $ty {
                fn shape() -> ReturnShape {
                    ReturnShape::Value
                }

                fn decode(result: QueryResult) -> Result<Self> {
                    decode_one(&result)
                }

                fn from_affected(affected: u64) -> Result<Self> {
                    <$ty>::try_from(affected).map_err(|_| {
                        BindError::Decode(format!(
                            "affected-row count {affected} does not fit in {}",
                            stringify!($ty)
                        ))
                    })
                }

                fn accepts(_kind: StatementKind) -> bool {
                    true
                }
            }
        )*
    };
}

scalar_output!(f32, f64, bool, String, Value);
count_output!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Output for () {
    fn shape() -> ReturnShape {
        ReturnShape::Unit
    }

    fn decode(_result: QueryResult) -> Result<Self> {
        Ok(())
    }

    fn from_affected(_affected: u64) -> Result<Self> {
        Ok(())
    }

    fn accepts(kind: StatementKind) -> bool {
        kind != StatementKind::Read
    }
}

impl<T> Output for Vec<T>
where
    T: Output + FromRow,
{
    fn shape() -> ReturnShape {
        ReturnShape::Sequence
    }

    fn columns() -> Vec<&'static str> {
        T::columns()
    }

    fn decode(result: QueryResult) -> Result<Self> {
        decode_all(&result)
    }
}

impl<T> Output for Box<T>
where
    T: Output + FromRow,
{
    fn shape() -> ReturnShape {
        ReturnShape::Reference
    }

    fn columns() -> Vec<&'static str> {
        T::columns()
    }

    fn decode(result: QueryResult) -> Result<Self> {
        decode_one(&result).map(Box::new)
    }
}

impl<T: Output> Output for Option<T> {
    fn shape() -> ReturnShape {
        ReturnShape::Optional
    }

    fn columns() -> Vec<&'static str> {
        T::columns()
    }

    fn decode(result: QueryResult) -> Result<Self> {
        match T::decode(result) {
            Ok(value) => Ok(Some(value)),
            Err(BindError::NoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn accepts(kind: StatementKind) -> bool {
        kind == StatementKind::Read && T::accepts(StatementKind::Read)
    }
}
