use std::fmt;

/// How a statement is executed. Fixed and exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `selects` section: query rows and decode them
    Read,
    /// `inserts` section: execute, then write back the generated identity
    Insert,
    /// `executes` section: execute and report affected rows
    Execute,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "select"),
            Self::Insert => write!(f, "insert"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// Positional placeholder syntax emitted by the bind functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` for every bind value (MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... counted across the whole statement (PostgreSQL)
    Numbered,
}

impl PlaceholderStyle {
    /// Placeholder for the bind value at 1-based `position`.
    pub fn placeholder(self, position: usize) -> String {
        match self {
            Self::Question => "?".to_string(),
            Self::Numbered => format!("${position}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(PlaceholderStyle::Question.placeholder(3), "?");
        assert_eq!(PlaceholderStyle::Numbered.placeholder(3), "$3");
    }
}
