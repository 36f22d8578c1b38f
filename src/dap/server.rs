use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::protocol::{shared_writer, LaunchArguments, MessageWriter, SharedWriter};
use crate::debugger::{
    initial_stop, step_in, step_out, step_over, DebugState, GhciSession, StepOutcome,
};
use crate::diagnostics::DiagnosticsEngine;
use crate::parser::{extract_functions, module_name};

const THREAD_ID: u64 = 1;
const FILE_SCOPE_REF: u64 = 1000;

/// The debug session: owns the stepping state, the stored launch
/// configuration, the interpreter subprocess, and the diagnostics engine.
/// One handler per DAP request.
pub struct DebugServer {
    writer: SharedWriter,
    state: DebugState,
    session: Option<GhciSession>,
    launch_args: Option<LaunchArguments>,
    diagnostics: Arc<Mutex<DiagnosticsEngine>>,
}

impl DebugServer {
    pub fn new() -> Self {
        let workspace = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            writer: shared_writer(),
            state: DebugState::new(),
            session: None,
            launch_args: None,
            diagnostics: Arc::new(Mutex::new(DiagnosticsEngine::new(workspace))),
        }
    }

    fn with_writer<F: FnOnce(&mut MessageWriter)>(&self, f: F) {
        if let Ok(mut w) = self.writer.lock() {
            f(&mut w);
        }
    }

    fn respond(&self, seq: u64, command: String, success: bool, body: Option<Value>) {
        self.with_writer(|w| w.send_response(seq, command, success, body));
    }

    pub fn respond_ok(&self, seq: u64, command: String) {
        self.respond(seq, command, true, None);
    }

    pub fn respond_fail(&self, seq: u64, command: String) {
        self.respond(seq, command, false, None);
    }

    fn error_response(&self, seq: u64, command: String, id: u64, format: &str) {
        self.with_writer(|w| w.send_error_response(seq, command, id, format));
    }

    fn output(&self, category: &str, text: &str) {
        self.with_writer(|w| w.output(category, text));
    }

    fn stopped(&self, reason: &str) {
        self.with_writer(|w| w.stopped(reason, THREAD_ID));
    }

    fn active_file(&self) -> Option<PathBuf> {
        self.launch_args
            .as_ref()
            .and_then(|args| args.active_file.as_ref())
            .map(PathBuf::from)
    }

    fn read_active_source(&self) -> Option<String> {
        fs::read_to_string(self.active_file()?).ok()
    }

    pub fn handle_initialize(&mut self, seq: u64, command: String) {
        let body = json!({
            "supportsConfigurationDoneRequest": true,
            "supportsFunctionBreakpoints": true,
            "supportsRestartRequest": true,
            "supportsStepInTargetsRequest": true,
            "supportsSetVariable": true,
            "supportsRestartFrame": true,
        });
        self.respond(seq, command, true, Some(body));
        self.with_writer(|w| w.send_event("initialized", None));
    }

    pub fn handle_launch(&mut self, seq: u64, command: String, arguments: Option<Value>) {
        let args = arguments
            .and_then(|v| serde_json::from_value::<LaunchArguments>(v).ok())
            .unwrap_or_default();

        match self.perform_launch(args) {
            Ok(()) => self.respond_ok(seq, command),
            Err(e) => self.error_response(
                seq,
                command,
                1001,
                &format!("Failed to launch debug session: {}", e),
            ),
        }
    }

    /// The launch body, shared by launch/attach/setBreakpoints/restart and
    /// the end-of-breakpoints relaunch. Emits events only; the caller owns
    /// the response.
    fn perform_launch(&mut self, args: LaunchArguments) -> io::Result<()> {
        if let Ok(mut engine) = self.diagnostics.lock() {
            engine.clear();
        }
        self.launch_args = Some(args.clone());

        let program = args.program.clone().unwrap_or_default();
        let program = program.trim();
        if !program.starts_with("cabal repl") {
            self.output(
                "console",
                "Please set \"program\": \"cabal repl --repl-no-load\" in launch.json\n",
            );
            return Ok(());
        }

        let cwd = match args
            .cwd
            .clone()
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
        {
            Some(dir) => dir,
            None => {
                self.output("stderr", "No workspace folder found\n");
                return Ok(());
            }
        };

        // Exclusive ownership: the previous interpreter dies before any
        // replacement is spawned.
        if let Some(old) = self.session.take() {
            old.kill();
        }

        self.output("console", "Launching GHCi...\n");

        let active_file = args.active_file.clone().map(PathBuf::from);
        if let Some(path) = &active_file {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(mut engine) = self.diagnostics.lock() {
                    engine.documents_mut().insert(path.clone(), content);
                }
            }
        }

        let (line, reason) = initial_stop(&self.state.breakpoints);
        self.state.current_line = Some(line);
        self.stopped(reason);
        self.output("console", &format!("breakpoint hit at {}\n", line));

        // A fresh interpreter is only spawned when the previous run marked
        // itself finished; otherwise this is a pure position reset.
        if self.state.relaunch_pending {
            let session = GhciSession::spawn(
                program,
                &cwd,
                active_file.clone(),
                self.writer.clone(),
                self.diagnostics.clone(),
            )?;
            self.session = Some(session);
            self.state.relaunch_pending = false;
        }

        if let (Some(session), Some(path)) = (&self.session, &active_file) {
            session.loader().request_load(path);
        }

        Ok(())
    }

    fn relaunch_with_stored(&mut self) {
        if let Some(args) = self.launch_args.clone() {
            if let Err(e) = self.perform_launch(args) {
                self.output("console", &format!("Failed to relaunch: {}\n", e));
            }
        }
    }

    pub fn handle_set_breakpoints(&mut self, seq: u64, command: String, arguments: Option<Value>) {
        let lines: Vec<usize> = arguments
            .as_ref()
            .and_then(|v| v.get("breakpoints"))
            .and_then(|v| v.as_array())
            .map(|bps| {
                bps.iter()
                    .filter_map(|bp| bp.get("line").and_then(|l| l.as_u64()))
                    .map(|l| l as usize)
                    .collect()
            })
            .unwrap_or_default();

        self.state.breakpoints = lines.clone();

        let verified: Vec<Value> = lines
            .iter()
            .map(|line| json!({ "verified": true, "line": line }))
            .collect();

        // A new breakpoint set always restarts the run.
        if self.launch_args.is_some() {
            self.relaunch_with_stored();
            self.respond(seq, command, true, Some(json!({ "breakpoints": verified })));
        } else {
            self.error_response(
                seq,
                command,
                1004,
                "Cannot restart: No previous launch configuration available",
            );
        }
    }

    fn apply_outcome(&mut self, seq: u64, command: String, outcome: StepOutcome) {
        match outcome {
            StepOutcome::NoOp => self.respond_ok(seq, command),
            StepOutcome::Stopped { reason, line } => {
                self.stopped(reason);
                self.output("console", &format!("breakpoint hit at {}\n", line));
                self.respond_ok(seq, command);
            }
            StepOutcome::SteppedInto { name, line, args } => {
                self.output(
                    "console",
                    &format!("Stepped into {} at line {}\n", name, line),
                );
                self.output(
                    "console",
                    &format!("Captured args: {}\n", format_args_map(&args)),
                );
                self.stopped("step");
                self.respond_ok(seq, command);
            }
            StepOutcome::SteppedOut { line, caller } => {
                self.output(
                    "console",
                    &format!("Stepped out to caller at line {} ({})\n", line, caller),
                );
                self.stopped("step");
                self.respond_ok(seq, command);
            }
            StepOutcome::RanToEnd { line } => {
                self.output(
                    "console",
                    &format!("Reached end of program at line {}\n", line),
                );
                if self.launch_args.is_some() {
                    self.respond_ok(seq, command);
                    self.relaunch_with_stored();
                } else {
                    self.error_response(
                        seq,
                        command,
                        1004,
                        "Cannot restart: No previous launch configuration available",
                    );
                }
            }
            StepOutcome::Relaunch => {
                if self.launch_args.is_some() {
                    self.respond_ok(seq, command);
                    self.relaunch_with_stored();
                } else {
                    self.error_response(
                        seq,
                        command,
                        1004,
                        "Cannot restart: No previous launch configuration available",
                    );
                }
            }
        }
    }

    pub fn handle_next(&mut self, seq: u64, command: String) {
        let source = self.read_active_source().unwrap_or_default();
        let outcome = step_over(&mut self.state, &source);
        self.apply_outcome(seq, command, outcome);
    }

    pub fn handle_step_in(&mut self, seq: u64, command: String) {
        let source = self.read_active_source().unwrap_or_default();
        let outcome = step_in(&mut self.state, &source);
        self.apply_outcome(seq, command, outcome);
    }

    pub fn handle_step_out(&mut self, seq: u64, command: String) {
        let source = self.read_active_source().unwrap_or_default();
        let outcome = step_out(&mut self.state, &source);
        self.apply_outcome(seq, command, outcome);
    }

    pub fn handle_threads(&mut self, seq: u64, command: String) {
        self.respond(
            seq,
            command,
            true,
            Some(json!({
                "threads": [ { "id": THREAD_ID, "name": "main" } ]
            })),
        );
    }

    pub fn handle_scopes(&mut self, seq: u64, command: String) {
        self.respond(
            seq,
            command,
            true,
            Some(json!({
                "scopes": [
                    {
                        "name": "File Info",
                        "variablesReference": FILE_SCOPE_REF,
                        "expensive": false
                    }
                ]
            })),
        );
    }

    pub fn handle_stack_trace(&mut self, seq: u64, command: String) {
        let active = self
            .active_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let name = Path::new(&active)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut frames: Vec<Value> = Vec::new();
        if let Some(line) = self.state.current_line {
            if line > 0 {
                frames.push(json!({
                    "id": 1,
                    "name": "main",
                    "line": line,
                    "column": 1,
                    "source": { "name": name, "path": active }
                }));
            }
        }

        let total = frames.len();
        self.respond(
            seq,
            command,
            true,
            Some(json!({ "stackFrames": frames, "totalFrames": total })),
        );
    }

    pub fn handle_variables(&mut self, seq: u64, command: String) {
        let mut variables: Vec<Value> = Vec::new();

        let active = self.active_file();
        let file_name = active
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let dir_name = active
            .as_deref()
            .and_then(Path::parent)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        variables.push(json!({ "name": "File", "value": file_name, "variablesReference": 0 }));
        variables.push(json!({ "name": "Directory", "value": dir_name, "variablesReference": 0 }));

        // Everything below is read fresh from disk; a read failure just
        // leaves the synthetic entries out.
        if let Some(content) = active.and_then(|p| fs::read_to_string(p).ok()) {
            if let Some(module) = module_name(&content) {
                variables.push(json!({
                    "name": "Module",
                    "value": module,
                    "variablesReference": 0
                }));
            }

            if self.state.current_line.is_some() {
                for func in extract_functions(&content) {
                    variables.push(json!({
                        "name": func.name,
                        "value": format!(
                            "f: {} {} = {}",
                            func.name,
                            func.args.join(" "),
                            func.body.join(" ")
                        ),
                        "evaluateName": func.name,
                        "variablesReference": 0
                    }));

                    for arg in &func.args {
                        let value = self
                            .state
                            .argument_value(arg)
                            .unwrap_or("not set")
                            .to_string();
                        variables.push(json!({
                            "name": arg,
                            "value": value,
                            "variablesReference": 0
                        }));
                    }
                }
            }
        }

        self.respond(seq, command, true, Some(json!({ "variables": variables })));
    }

    pub fn handle_evaluate(&mut self, seq: u64, command: String, arguments: Option<Value>) {
        let expression = arguments
            .as_ref()
            .and_then(|v| v.get("expression"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let session = match &self.session {
            Some(session) => session,
            None => {
                self.error_response(
                    seq,
                    command,
                    1003,
                    "Evaluation failed: GHCi process not running",
                );
                return;
            }
        };

        if let Err(e) = session.write_line(&expression) {
            self.error_response(seq, command, 1003, &format!("Evaluation failed: {}", e));
            return;
        }

        // Fire-and-forget by contract: this response is only an
        // acknowledgement, the REPL's reply shows up on the stdout channel.
        self.respond(
            seq,
            command,
            true,
            Some(json!({
                "result": format!("Evaluating: {}", expression),
                "variablesReference": 0
            })),
        );
    }

    pub fn handle_restart(&mut self, seq: u64, command: String) {
        self.state.relaunch_pending = false;
        self.output("console", "Restarting debug session...\n");

        if let Some(old) = self.session.take() {
            old.kill();
        }

        match self.launch_args.clone() {
            Some(args) => match self.perform_launch(args) {
                Ok(()) => self.respond_ok(seq, command),
                Err(e) => self.error_response(
                    seq,
                    command,
                    1001,
                    &format!("Failed to launch debug session: {}", e),
                ),
            },
            None => self.error_response(
                seq,
                command,
                1004,
                "Cannot restart: No previous launch configuration available",
            ),
        }
    }

    pub fn handle_disconnect(&mut self, seq: u64, command: String) {
        if let Some(old) = self.session.take() {
            old.kill();
        }
        self.with_writer(|w| w.terminated());
        self.respond_ok(seq, command);
    }
}

impl Default for DebugServer {
    fn default() -> Self {
        Self::new()
    }
}

fn format_args_map(args: &[(String, String)]) -> String {
    let entries: Vec<String> = args
        .iter()
        .map(|(name, value)| format!("\"{}\":\"{}\"", name, value))
        .collect();
    format!("{{{}}}", entries.join(","))
}
