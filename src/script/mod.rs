//! Sandboxed pre-request and test scripts.

mod bindings;
mod context;
mod result;
mod sandbox;
pub mod watchdog;

pub use context::{get_variable, set_variable, ExecutionContext, VariableList};
pub use result::{TestOutcome, TestResult};
pub use sandbox::{run_script, Sandbox, DEFAULT_MEMORY_LIMIT, DEFAULT_SCRIPT_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptPhase {
    PreRequest,
    Test,
}

impl ScriptPhase {
    pub fn listen_tag(self) -> &'static str {
        match self {
            ScriptPhase::PreRequest => "prerequest",
            ScriptPhase::Test => "test",
        }
    }

    pub fn from_listen_tag(tag: &str) -> Option<Self> {
        match tag {
            "prerequest" => Some(ScriptPhase::PreRequest),
            "test" => Some(ScriptPhase::Test),
            _ => None,
        }
    }
}
