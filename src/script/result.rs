use crate::error::ScriptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestOutcome {
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: None,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Outcome of one or more scripts: named tests in declaration order plus
/// script-level errors. Console output is kept alongside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestResult {
    pub outcomes: Vec<TestOutcome>,
    pub errors: Vec<ScriptError>,
    pub logs: Vec<String>,
}

impl TestResult {
    /// True when there are no script errors and no failing tests.
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.outcomes.iter().all(|outcome| outcome.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.passed).count()
    }

    pub fn timed_out(&self) -> bool {
        self.errors.iter().any(ScriptError::is_timeout)
    }

    pub fn get(&self, name: &str) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|outcome| outcome.name == name)
    }

    /// Appends `other` after the entries already recorded.
    pub fn merge(&mut self, other: TestResult) {
        self.outcomes.extend(other.outcomes);
        self.errors.extend(other.errors);
        self.logs.extend(other.logs);
    }
}
