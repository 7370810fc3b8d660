use crate::core::{BindError, PlaceholderStyle, Result, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Per-call state shared by the template functions of one render: the
/// ordered bind values collected so far.
#[derive(Debug, Clone, Default)]
pub struct BindContext {
    binds: Vec<Value>,
    style: PlaceholderStyle,
}

impl BindContext {
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            binds: Vec::new(),
            style,
        }
    }

    /// Append a bind value and return its placeholder.
    pub fn bind(&mut self, value: Value) -> String {
        self.binds.push(value);
        self.style.placeholder(self.binds.len())
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    pub fn style(&self) -> PlaceholderStyle {
        self.style
    }

    pub fn into_binds(self) -> Vec<Value> {
        self.binds
    }
}

/// A function callable from a template as `{{ name operand }}` or
/// `{{ operand | name }}`.
pub trait TemplateFunction: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, ctx: &mut BindContext, value: &Value) -> Result<String>;
}

/// `arg`: bind one scalar value.
pub struct ArgFunction;

impl TemplateFunction for ArgFunction {
    fn name(&self) -> &str {
        "arg"
    }

    fn call(&self, ctx: &mut BindContext, value: &Value) -> Result<String> {
        if !value.is_scalar() {
            return Err(BindError::TemplateExecution(format!(
                "arg: expected a scalar value, got {}",
                value.type_name()
            )));
        }
        Ok(ctx.bind(value.clone()))
    }
}

/// `in`: bind every element of a list and emit `in (?,?,...)`.
pub struct InFunction;

impl TemplateFunction for InFunction {
    fn name(&self) -> &str {
        "in"
    }

    fn call(&self, ctx: &mut BindContext, value: &Value) -> Result<String> {
        let Value::List(items) = value else {
            return Err(BindError::TemplateExecution(format!(
                "in: expected a list, got {}",
                value.type_name()
            )));
        };
        if items.is_empty() {
            return Err(BindError::TemplateExecution(
                "in: cannot expand an empty list".to_string(),
            ));
        }

        let mut placeholders = Vec::with_capacity(items.len());
        for item in items {
            if !item.is_scalar() {
                return Err(BindError::TemplateExecution(format!(
                    "in: list elements must be scalar, got {}",
                    item.type_name()
                )));
            }
            placeholders.push(ctx.bind(item.clone()));
        }
        Ok(format!("in ({})", placeholders.join(",")))
    }
}

/// Adapter turning a closure into a [`TemplateFunction`].
pub struct FnFunction<F> {
    name: String,
    f: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&mut BindContext, &Value) -> Result<String> + Send + Sync,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> TemplateFunction for FnFunction<F>
where
    F: Fn(&mut BindContext, &Value) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, ctx: &mut BindContext, value: &Value) -> Result<String> {
        (self.f)(ctx, value)
    }
}

/// Registry of template functions, looked up by name.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: Vec<Arc<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    /// Registry holding the built-in `arg` and `in` functions.
    pub fn with_default_functions() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ArgFunction));
        registry.register(Arc::new(InFunction));
        registry
    }

    /// Register a function, replacing any function of the same name.
    pub fn register(&mut self, function: Arc<dyn TemplateFunction>) {
        debug!(name = function.name(), "registered template function");
        match self
            .functions
            .iter()
            .position(|f| f.name() == function.name())
        {
            Some(index) => self.functions[index] = function,
            None => self.functions.push(function),
        }
    }

    pub fn find(&self, name: &str) -> Option<&dyn TemplateFunction> {
        self.functions
            .iter()
            .find(|f| f.name() == name)
            .map(|f| &**f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name()).collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_default_functions()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_binds_scalars_only() {
        let mut ctx = BindContext::new(PlaceholderStyle::Question);
        assert_eq!(ArgFunction.call(&mut ctx, &Value::from("bar")).unwrap(), "?");
        assert!(ArgFunction.call(&mut ctx, &Value::from(vec![1i64])).is_err());
        assert_eq!(ctx.binds(), &[Value::from("bar")]);
    }

    #[test]
    fn test_in_expands_list() {
        let mut ctx = BindContext::new(PlaceholderStyle::Numbered);
        ctx.bind(Value::Integer(0));
        let sql = InFunction
            .call(&mut ctx, &Value::from(vec![1i64, 2, 3]))
            .unwrap();
        assert_eq!(sql, "in ($2,$3,$4)");
        assert_eq!(ctx.into_binds().len(), 4);
    }

    #[test]
    fn test_in_rejects_empty_and_non_lists() {
        let mut ctx = BindContext::default();
        let empty = InFunction.call(&mut ctx, &Value::List(vec![]));
        assert!(matches!(empty, Err(BindError::TemplateExecution(_))));
        assert!(InFunction.call(&mut ctx, &Value::Integer(1)).is_err());
        assert!(ctx.binds().is_empty());
    }

    #[test]
    fn test_register_replaces_by_name() {
        let mut registry = FunctionRegistry::with_default_functions();
        registry.register(Arc::new(FnFunction::new("arg", |_ctx, _value| Ok("X".to_string()))));
        assert_eq!(registry.names(), vec!["arg", "in"]);

        let mut ctx = BindContext::default();
        let arg = registry.find("arg").unwrap();
        assert_eq!(arg.call(&mut ctx, &Value::Null).unwrap(), "X");
        assert!(!registry.contains("like"));
    }
}
