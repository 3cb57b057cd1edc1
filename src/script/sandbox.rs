use std::{cell::RefCell, rc::Rc, time::Duration};

use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Runtime, Value};
use tracing::{debug, warn};

use crate::error::ScriptError;

use super::{
    bindings::{self, describe_exception, describe_thrown, Bindings},
    context::ExecutionContext,
    result::TestResult,
    watchdog::Watchdog,
    ScriptPhase,
};

pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;
const MAX_STACK_SIZE: usize = 1024 * 1024;

/// Runs scripts in a fresh QuickJS runtime per invocation.
#[derive(Debug, Clone, Copy)]
pub struct Sandbox {
    memory_limit: usize,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl Sandbox {
    pub fn new(memory_limit: usize) -> Self {
        Self { memory_limit }
    }

    /// Evaluates `source` against `context`. Variable mutations land in the
    /// context's lists as they happen; everything else is reported on the
    /// returned `TestResult`.
    pub fn run(
        &self,
        source: &str,
        phase: ScriptPhase,
        context: &ExecutionContext,
        deadline: Duration,
    ) -> TestResult {
        let recorder = Rc::new(RefCell::new(TestResult::default()));
        if let Err(err) = self.evaluate(source, phase, context, deadline, &recorder) {
            recorder.borrow_mut().errors.push(err);
        }
        let result = std::mem::take(&mut *recorder.borrow_mut());
        debug!(
            phase = phase.listen_tag(),
            tests = result.outcomes.len(),
            errors = result.errors.len(),
            "script finished"
        );
        result
    }

    fn evaluate(
        &self,
        source: &str,
        phase: ScriptPhase,
        context: &ExecutionContext,
        deadline: Duration,
        recorder: &Rc<RefCell<TestResult>>,
    ) -> Result<(), ScriptError> {
        let runtime = Runtime::new().map_err(setup_error)?;
        runtime.set_memory_limit(self.memory_limit);
        runtime.set_max_stack_size(MAX_STACK_SIZE);

        let mut watchdog =
            Watchdog::arm(deadline).map_err(|err| ScriptError::Setup(err.to_string()))?;
        runtime.set_interrupt_handler(Some(Box::new(watchdog.interrupt_handler())));

        let js = Context::full(&runtime).map_err(setup_error)?;
        let bindings = Bindings {
            phase,
            context: context.clone(),
            recorder: recorder.clone(),
            interrupted: watchdog.interrupted_flag(),
        };

        let outcome = js.with(|ctx| {
            bindings::install(&ctx, &bindings).map_err(setup_error)?;
            ctx.eval::<Value, _>(source)
                .catch(&ctx)
                .map(|_| ())
                .map_err(|caught| ScriptError::Runtime(describe_caught(&ctx, caught)))
        });
        watchdog.disarm();

        if watchdog.interrupted() {
            warn!(
                deadline_ms = deadline.as_millis() as u64,
                phase = phase.listen_tag(),
                "script interrupted by watchdog"
            );
            return Err(ScriptError::Timeout(deadline));
        }
        outcome
    }
}

/// Runs one script body with default limits.
pub fn run_script(
    source: &str,
    phase: ScriptPhase,
    context: &ExecutionContext,
    deadline: Duration,
) -> TestResult {
    Sandbox::default().run(source, phase, context, deadline)
}

fn setup_error(err: rquickjs::Error) -> ScriptError {
    ScriptError::Setup(err.to_string())
}

fn describe_caught<'js>(ctx: &Ctx<'js>, caught: CaughtError<'js>) -> String {
    match caught {
        CaughtError::Exception(exception) => describe_exception(&exception),
        CaughtError::Value(value) => describe_thrown(ctx, value),
        CaughtError::Error(err) => err.to_string(),
    }
}
