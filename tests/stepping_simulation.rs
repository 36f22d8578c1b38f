// Walks the stepping state machine through realistic source fixtures, the
// way a client would drive it: launch position, step-over between
// breakpoints, step-into a callee, step back out.

use std::fs;

use haskell_debugger::debugger::{
    initial_stop, step_in, step_out, step_over, DebugState, StepOutcome,
};

fn create_fixture(name: &str, content: &str) -> String {
    let filename = format!("fixture_{}.hs", name);
    fs::write(&filename, content).expect("Failed to write fixture");
    filename
}

fn cleanup(filename: &str) {
    let _ = fs::remove_file(filename);
}

const DEMO: &str = "\
module Demo where

double x = x * 2

add a b = a + b

main = double 5
";

#[cfg(test)]
mod stepping_tests {
    use super::*;

    #[test]
    fn test_launch_position_with_breakpoints() {
        assert_eq!(initial_stop(&[5, 10, 15]), (5, "breakpoint"));
        assert_eq!(initial_stop(&[]), (1, "entry"));
    }

    #[test]
    fn test_step_over_advances_to_next_breakpoint() {
        let source = "line\n".repeat(20);
        let mut state = DebugState::new();
        state.breakpoints = vec![5, 10, 15];
        state.current_line = Some(5);

        let outcome = step_over(&mut state, &source);

        assert_eq!(
            outcome,
            StepOutcome::Stopped {
                reason: "step",
                line: 10
            }
        );
        assert_eq!(state.current_line, Some(10));
    }

    #[test]
    fn test_step_over_first_call_parks_on_first_breakpoint() {
        let source = "line\n".repeat(20);
        let mut state = DebugState::new();
        state.breakpoints = vec![7, 12];

        let outcome = step_over(&mut state, &source);

        assert_eq!(
            outcome,
            StepOutcome::Stopped {
                reason: "breakpoint",
                line: 7
            }
        );
    }

    #[test]
    fn test_step_over_past_last_breakpoint_runs_to_end() {
        let source = "line\n".repeat(20);
        let mut state = DebugState::new();
        state.breakpoints = vec![5];
        state.current_line = Some(5);

        let outcome = step_over(&mut state, &source);

        assert_eq!(outcome, StepOutcome::RanToEnd { line: 20 });
        assert_eq!(state.current_line, Some(20));
        assert!(state.relaunch_pending, "next launch spawns a fresh REPL");
    }

    #[test]
    fn test_step_over_without_breakpoints_relaunches() {
        let mut state = DebugState::new();

        let outcome = step_over(&mut state, "main = ()\n");

        assert_eq!(outcome, StepOutcome::Relaunch);
        assert!(state.relaunch_pending);
    }

    #[test]
    fn test_step_into_known_function() {
        let filename = create_fixture("step_into", DEMO);
        let source = fs::read_to_string(&filename).expect("Could not read fixture");

        let mut state = DebugState::new();
        state.breakpoints = vec![7];
        state.current_line = Some(7); // main = double 5

        let outcome = step_in(&mut state, &source);

        assert_eq!(
            outcome,
            StepOutcome::SteppedInto {
                name: "double".to_string(),
                line: 3,
                args: vec![("x".to_string(), "5".to_string())],
            }
        );
        assert_eq!(state.current_line, Some(3));
        assert_eq!(state.call_stack.len(), 1);
        assert_eq!(state.call_stack[0].caller_line, 7);
        assert_eq!(state.call_stack[0].caller_func, "double");
        assert_eq!(state.argument_value("x"), Some("5"));

        cleanup(&filename);
    }

    #[test]
    fn test_step_out_returns_to_caller() {
        let filename = create_fixture("step_out", DEMO);
        let source = fs::read_to_string(&filename).expect("Could not read fixture");

        let mut state = DebugState::new();
        state.breakpoints = vec![7];
        state.current_line = Some(7);

        step_in(&mut state, &source);
        let outcome = step_out(&mut state, &source);

        assert_eq!(
            outcome,
            StepOutcome::SteppedOut {
                line: 7,
                caller: "double".to_string()
            }
        );
        assert_eq!(state.current_line, Some(7));
        assert!(state.call_stack.is_empty());

        cleanup(&filename);
    }

    #[test]
    fn test_step_out_with_empty_stack_delegates_to_step_over() {
        let source = "line\n".repeat(10);
        let mut state = DebugState::new();
        state.breakpoints = vec![2, 4];
        state.current_line = Some(2);

        let outcome = step_out(&mut state, &source);

        assert_eq!(
            outcome,
            StepOutcome::Stopped {
                reason: "step",
                line: 4
            }
        );
    }

    #[test]
    fn test_step_in_missing_arguments_get_sentinel() {
        let source = "\
add a b = a + b

main = add 1
";
        let mut state = DebugState::new();
        state.breakpoints = vec![3];
        state.current_line = Some(3);

        let outcome = step_in(&mut state, &source);

        match outcome {
            StepOutcome::SteppedInto { args, .. } => {
                assert_eq!(
                    args,
                    vec![
                        ("a".to_string(), "1".to_string()),
                        ("b".to_string(), "<missing>".to_string()),
                    ]
                );
            }
            other => panic!("expected SteppedInto, got {:?}", other),
        }
    }

    #[test]
    fn test_step_in_unknown_callee_falls_back_to_step_over() {
        let source = "\
main = putStrLn greeting

done = ()
";
        let mut state = DebugState::new();
        state.breakpoints = vec![1, 3];
        state.current_line = Some(1);

        let outcome = step_in(&mut state, &source);

        // Neither putStrLn nor greeting is a known definition, so this
        // behaves like a plain step-over.
        assert_eq!(
            outcome,
            StepOutcome::Stopped {
                reason: "step",
                line: 3
            }
        );
        assert!(state.call_stack.is_empty());
    }

    #[test]
    fn test_step_in_is_disabled_after_run_ends() {
        let mut state = DebugState::new();
        state.breakpoints = vec![1];
        state.current_line = Some(1);
        state.relaunch_pending = true;

        assert_eq!(step_in(&mut state, DEMO), StepOutcome::NoOp);
    }
}

#[cfg(test)]
mod loader_tests {
    use super::*;

    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use haskell_debugger::dap::shared_writer;
    use haskell_debugger::debugger::{GhciSession, LOAD_DEBOUNCE};
    use haskell_debugger::diagnostics::DiagnosticsEngine;

    // Uses `cat` as a stand-in interpreter: it accepts stdin and echoes it
    // back, which is all the loader plumbing needs.
    #[test]
    fn test_load_is_debounced() {
        let filename = create_fixture("loader", DEMO);

        let writer = shared_writer();
        let engine = Arc::new(Mutex::new(DiagnosticsEngine::new(".")));

        let session = GhciSession::spawn("cat", Path::new("."), None, writer, engine)
            .expect("Failed to spawn stand-in interpreter");

        session.loader().request_load(Path::new(&filename));
        session.loader().request_load(Path::new(&filename));

        assert!(
            !session.loader().is_loaded(),
            "nothing is written before the debounce delay"
        );

        std::thread::sleep(LOAD_DEBOUNCE + Duration::from_millis(200));
        assert!(session.loader().is_loaded());

        // Unchanged content: the reload is skipped, the flag stays set.
        session.loader().request_load(Path::new(&filename));
        assert!(session.loader().is_loaded());

        session.kill();
        cleanup(&filename);
    }

    #[test]
    fn test_non_source_files_are_rejected() {
        let filename = "fixture_loader.txt";
        fs::write(filename, "not haskell").expect("Failed to write fixture");

        let writer = shared_writer();
        let engine = Arc::new(Mutex::new(DiagnosticsEngine::new(".")));

        let session = GhciSession::spawn("cat", Path::new("."), None, writer, engine)
            .expect("Failed to spawn stand-in interpreter");

        session.loader().request_load(Path::new(filename));

        std::thread::sleep(LOAD_DEBOUNCE + Duration::from_millis(200));
        assert!(
            !session.loader().is_loaded(),
            "non-.hs files must not be loaded"
        );

        session.kill();
        cleanup(filename);
    }
}
