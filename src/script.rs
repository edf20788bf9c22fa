//! Rendered SQL for a single refactoring

use std::fmt;

/// Ordered SQL statements plus a human-readable description
///
/// Statements are stored without a trailing `;`. They run in order inside
/// the refactoring's transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    description: String,
    statements: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script holding a single statement
    pub fn single(statement: impl Into<String>) -> Self {
        let mut script = Self::new();
        script.push(statement);
        script
    }

    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    pub fn append(&mut self, other: Script) {
        self.statements.extend(other.statements);
    }

    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl<'a> IntoIterator for &'a Script {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement};")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_display() {
        let mut script = Script::single("CREATE TABLE a (id INTEGER)").described("create table a");
        script.append(Script::single("CREATE INDEX i ON a (id)"));

        assert_eq!(script.len(), 2);
        assert_eq!(script.description(), "create table a");
        assert_eq!(
            script.to_string(),
            "CREATE TABLE a (id INTEGER);\nCREATE INDEX i ON a (id);\n"
        );
    }
}
