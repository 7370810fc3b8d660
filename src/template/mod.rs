//! Statement templates: `{{ }}` actions rendered into SQL text plus ordered
//! bind values.

mod functions;
mod parser;
mod renderer;

pub use functions::{ArgFunction, BindContext, FnFunction, FunctionRegistry, InFunction, TemplateFunction};
pub use parser::{Command, Node, Operand, Pipeline};
pub use renderer::{RenderedQuery, Scope, Template};
