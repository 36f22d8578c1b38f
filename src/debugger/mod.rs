mod session;
mod state;

pub use session::{FileLoader, GhciSession, LOAD_DEBOUNCE};
pub use state::{initial_stop, step_in, step_out, step_over, DebugState, StepOutcome};

/// One step-into record: the line we stepped from and the definition it
/// belongs to, so step-out can land back there.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    pub caller_line: usize,
    pub caller_func: String,
}
