mod decode;
mod result;

pub use decode::{FromRow, FromValue, Output, Record, ReturnShape, decode_all, decode_one};
pub use result::{ExecResult, QueryResult, Row, RowRef};
