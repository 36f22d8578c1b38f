use regex::Regex;

use super::CallFrame;
use crate::parser::{caller_name, extract_functions, extract_words, find_function_definition_line};

/// Session-scoped stepping state: the virtual program counter plus the
/// bookkeeping that advances it.
///
/// There is no interpreter instrumentation behind any of this — stepping is
/// a pure text-position walk over the breakpoint list and the extracted
/// function table.
#[derive(Debug, Default)]
pub struct DebugState {
    /// Stop points for step-over, in the order the client sent them.
    pub breakpoints: Vec<usize>,
    /// Virtual program counter, 1-based; `None` before the first step.
    pub current_line: Option<usize>,
    pub call_stack: Vec<CallFrame>,
    /// Parameter name -> last-observed textual argument, replaced wholesale
    /// on every step-into.
    pub argument_map: Vec<(String, String)>,
    /// No further stepping is possible; the next launch spawns a fresh
    /// interpreter.
    pub relaunch_pending: bool,
}

impl DebugState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn argument_value(&self, name: &str) -> Option<&str> {
        self.argument_map
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value.as_str())
    }
}

/// What a stepping request did; the server turns this into protocol events.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Parked on `line`; emit a stopped event with `reason`.
    Stopped { reason: &'static str, line: usize },
    /// Walked past the last breakpoint onto the file's final line; the
    /// session relaunches after reporting it.
    RanToEnd { line: usize },
    /// No breakpoints to step between: run to completion and relaunch.
    Relaunch,
    /// Jumped into a callee's definition line.
    SteppedInto {
        name: String,
        line: usize,
        args: Vec<(String, String)>,
    },
    /// Returned to the caller recorded by the matching step-into.
    SteppedOut { line: usize, caller: String },
    /// Nothing to do; answer the request and leave the state alone.
    NoOp,
}

/// Where a fresh launch parks the program counter: the first breakpoint, or
/// line 1 with an "entry" stop when there are none.
pub fn initial_stop(breakpoints: &[usize]) -> (usize, &'static str) {
    match breakpoints.first() {
        Some(&line) => (line, "breakpoint"),
        None => (1, "entry"),
    }
}

/// Step-over: advance the program counter to the next breakpoint.
pub fn step_over(state: &mut DebugState, source: &str) -> StepOutcome {
    if state.breakpoints.is_empty() {
        state.relaunch_pending = true;
        return StepOutcome::Relaunch;
    }

    let current = match state.current_line {
        None => {
            // First step of the run: park on the first breakpoint.
            let first = state.breakpoints[0];
            state.current_line = Some(first);
            return StepOutcome::Stopped {
                reason: "breakpoint",
                line: first,
            };
        }
        Some(line) => line,
    };

    match state.breakpoints.iter().position(|&bp| bp == current) {
        Some(i) if i + 1 < state.breakpoints.len() => {
            let next = state.breakpoints[i + 1];
            state.current_line = Some(next);
            state.relaunch_pending = false;
            StepOutcome::Stopped {
                reason: "step",
                line: next,
            }
        }
        _ => {
            // On the last breakpoint, or on a line no longer in the list:
            // jump to the end of the file and start over on the next launch.
            state.relaunch_pending = true;
            let last = source.lines().count().max(1);
            state.current_line = Some(last);
            StepOutcome::RanToEnd { line: last }
        }
    }
}

/// Step-into: find a known function named on the current line's right-hand
/// side and jump to its definition, recording the call site.
///
/// Falls back to step-over when the line has no right-hand side or names no
/// known function.
pub fn step_in(state: &mut DebugState, source: &str) -> StepOutcome {
    if state.relaunch_pending {
        return StepOutcome::NoOp;
    }
    let current = match state.current_line {
        Some(line) => line,
        None => return StepOutcome::NoOp,
    };

    let full_line = match source.lines().nth(current.saturating_sub(1)) {
        Some(line) => line.to_string(),
        None => return StepOutcome::NoOp,
    };

    // Text between the first and second `=` is the callable right-hand side.
    let rhs = match full_line.split('=').nth(1).map(str::trim) {
        Some(rhs) if !rhs.is_empty() => rhs.to_string(),
        _ => return step_over(state, source),
    };

    let words = extract_words(&rhs);
    let functions = extract_functions(source);

    for word in &words {
        let target = match functions.iter().find(|f| &f.name == word) {
            Some(func) => func,
            None => continue,
        };

        let target_line = find_function_definition_line(source, word);
        if target_line == 0 {
            continue;
        }

        state.call_stack.push(CallFrame {
            caller_line: current,
            caller_func: caller_name(&full_line),
        });
        state.current_line = Some(target_line);
        state.argument_map = capture_arguments(&rhs, word, &target.args);

        return StepOutcome::SteppedInto {
            name: word.clone(),
            line: target_line,
            args: state.argument_map.clone(),
        };
    }

    step_over(state, source)
}

/// Step-out: pop the most recent call frame and park on its caller line.
pub fn step_out(state: &mut DebugState, source: &str) -> StepOutcome {
    if state.current_line.is_none() {
        return StepOutcome::NoOp;
    }

    let frame = match state.call_stack.pop() {
        Some(frame) => frame,
        None => return step_over(state, source),
    };

    state.current_line = Some(frame.caller_line);
    StepOutcome::SteppedOut {
        line: frame.caller_line,
        caller: frame.caller_func,
    }
}

/// Match the words trailing the callee name positionally against its
/// parameter list. Nested expressions and partial application shift the
/// token count, in which case absent positions get the `<missing>` marker —
/// the mapping is textual, not semantic.
fn capture_arguments(rhs: &str, callee: &str, params: &[String]) -> Vec<(String, String)> {
    let trailing = Regex::new(&format!(r"{}\s+(.*)", regex::escape(callee)))
        .ok()
        .and_then(|re| re.captures(rhs))
        .map(|caps| caps[1].to_string())
        .unwrap_or_default();

    let values: Vec<&str> = trailing.split_whitespace().collect();

    params
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = values.get(i).copied().unwrap_or("<missing>");
            (name.clone(), value.to_string())
        })
        .collect()
}
