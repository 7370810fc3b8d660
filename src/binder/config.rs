use crate::core::PlaceholderStyle;

/// Binder configuration
#[derive(Debug, Clone, Default)]
pub struct BinderConfig {
    /// Placeholder syntax emitted by `arg` and `in`
    pub placeholder: PlaceholderStyle,

    /// Log every rendered statement at info level instead of debug
    pub show_sql: bool,
}

impl BinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder style
    pub fn placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = style;
        self
    }

    /// Log rendered SQL at info level
    pub fn show_sql(mut self, show: bool) -> Self {
        self.show_sql = show;
        self
    }
}
