pub mod catalog;
pub mod source;
pub mod store;

pub use catalog::{Catalog, EntityDefinitionSet, StatementDefinition, merge, split_args};
pub use source::{DefinitionSource, SOURCE_SUFFIX, StatementSource, read_dir};
pub use store::DefinitionStore;
