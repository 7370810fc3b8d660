use super::functions::{BindContext, FunctionRegistry};
use super::parser::{self, Command, Node, Operand, Pipeline};
use crate::core::{BindError, PlaceholderStyle, Result, Value};
use std::collections::BTreeMap;

/// Named values visible to a template while it renders.
pub type Scope = BTreeMap<String, Value>;

/// Final SQL text plus the bind values its placeholders refer to, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<Value>,
}

/// A compiled statement template. Immutable and safe to share between
/// concurrent renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse `body`. Function names are checked against `functions`, so an
    /// unknown function fails here rather than at render time.
    pub fn compile(name: &str, body: &str, functions: &FunctionRegistry) -> Result<Self> {
        let nodes = parser::parse(body, functions).map_err(|message| BindError::TemplateSyntax {
            statement: name.to_string(),
            message,
        })?;
        Ok(Self {
            name: name.to_string(),
            nodes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn render(
        &self,
        scope: &Scope,
        functions: &FunctionRegistry,
        style: PlaceholderStyle,
    ) -> Result<RenderedQuery> {
        let mut renderer = Renderer {
            template: &self.name,
            scope,
            functions,
            ctx: BindContext::new(style),
            sql: String::new(),
        };
        renderer.render_nodes(&self.nodes)?;
        Ok(RenderedQuery {
            sql: renderer.sql,
            binds: renderer.ctx.into_binds(),
        })
    }
}

struct Renderer<'a> {
    template: &'a str,
    scope: &'a Scope,
    functions: &'a FunctionRegistry,
    ctx: BindContext,
    sql: String,
}

impl Renderer<'_> {
    fn error(&self, message: String) -> BindError {
        BindError::TemplateExecution(format!("{}: {message}", self.template))
    }

    fn render_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.sql.push_str(text),
                Node::Action(pipeline) => {
                    let value = self.eval_pipeline(pipeline)?;
                    self.sql.push_str(&value.to_string());
                }
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    if self.eval_pipeline(condition)?.is_truthy() {
                        self.render_nodes(then_branch)?;
                    } else {
                        self.render_nodes(else_branch)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_pipeline(&mut self, pipeline: &Pipeline) -> Result<Value> {
        let mut current: Option<Value> = None;
        for command in &pipeline.commands {
            let value = match command {
                Command::Operand(operand) => self.eval_operand(operand)?,
                Command::Call { function, argument } => {
                    let input = match (argument, current.take()) {
                        (Some(operand), _) => self.eval_operand(operand)?,
                        (None, Some(previous)) => previous,
                        (None, None) => {
                            return Err(self.error(format!("function {function} has no argument")));
                        }
                    };
                    self.call(function, &input)?
                }
            };
            current = Some(value);
        }
        Ok(current.unwrap_or_default())
    }

    fn call(&mut self, name: &str, input: &Value) -> Result<Value> {
        let Some(function) = self.functions.find(name) else {
            return Err(self.error(format!("function {name} is not registered")));
        };
        function.call(&mut self.ctx, input).map(Value::Text)
    }

    fn eval_operand(&self, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Variable(path) => {
                let Some((root, fields)) = path.split_first() else {
                    return Err(self.error("empty variable path".to_string()));
                };
                let mut value = self
                    .scope
                    .get(root)
                    .ok_or_else(|| self.error(format!("undefined variable '{root}'")))?;
                for field in fields {
                    value = value.field(field).ok_or_else(|| {
                        self.error(format!("{} has no field '{field}'", value.type_name()))
                    })?;
                }
                Ok(value.clone())
            }
        }
    }
}
