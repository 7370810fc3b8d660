pub mod error;
pub mod types;
pub mod value;

pub use error::{BindError, Result};
pub use types::{PlaceholderStyle, StatementKind};
pub use value::Value;
