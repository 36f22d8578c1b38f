use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::dap::SharedWriter;
use crate::diagnostics::DiagnosticsEngine;

/// Prompt fragments that mean the REPL is ready for input.
const READY_PROMPTS: &[&str] = &["Prelude>", "*Main>", "Ok,"];

/// Delay before a `:l` is actually written, so rapid reload requests
/// coalesce into one.
pub const LOAD_DEBOUNCE: Duration = Duration::from_millis(300);

/// A live interpreter subprocess, exclusively owned by the debug session.
///
/// stdout is watched for a readiness prompt (first sighting loads the active
/// file) and forwarded to the client as "stdout" output events; stderr feeds
/// the diagnostics engine and the "stderr" channel. Killing the session is
/// request-now/effect-later: the exit watcher thread observes the exit.
pub struct GhciSession {
    child: Arc<Mutex<Child>>,
    stdin: Arc<Mutex<ChildStdin>>,
    loader: FileLoader,
    suppress_exit: Arc<AtomicBool>,
}

impl GhciSession {
    pub fn spawn(
        program: &str,
        cwd: &Path,
        active_file: Option<PathBuf>,
        writer: SharedWriter,
        diagnostics: Arc<Mutex<DiagnosticsEngine>>,
    ) -> io::Result<GhciSession> {
        let argv = shlex::split(program)
            .unwrap_or_else(|| program.split_whitespace().map(str::to_string).collect());
        let (cmd, rest) = argv.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty interpreter command")
        })?;

        let mut child = Command::new(cmd)
            .args(rest)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "no stdin"))?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdin = Arc::new(Mutex::new(stdin));
        let loader = FileLoader::new(stdin.clone(), writer.clone());
        let suppress_exit = Arc::new(AtomicBool::new(false));

        if let Some(mut out) = stdout {
            let writer = writer.clone();
            let loader = loader.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match out.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).to_string();
                            if let Ok(mut w) = writer.lock() {
                                w.output("stdout", &text);
                            }
                            if !loader.is_loaded()
                                && READY_PROMPTS.iter().any(|p| text.contains(p))
                            {
                                if let Some(file) = &active_file {
                                    loader.request_load(file);
                                }
                            }
                        }
                    }
                }
            });
        }

        if let Some(mut err) = stderr {
            let writer = writer.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match err.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).to_string();
                            if let Ok(mut engine) = diagnostics.lock() {
                                engine.process_chunk(&text);
                            }
                            if let Ok(mut w) = writer.lock() {
                                w.output("stderr", &text);
                            }
                        }
                    }
                }
            });
        }

        let child = Arc::new(Mutex::new(child));
        {
            let child = child.clone();
            let writer = writer.clone();
            let suppress_exit = suppress_exit.clone();
            thread::spawn(move || loop {
                let status = match child.lock() {
                    Ok(mut child) => child.try_wait(),
                    Err(_) => break,
                };
                match status {
                    Ok(Some(status)) => {
                        if !suppress_exit.load(Ordering::SeqCst) {
                            if let Ok(mut w) = writer.lock() {
                                w.output(
                                    "console",
                                    &format!(
                                        "GHCi exited with code {}\n",
                                        status.code().unwrap_or(-1)
                                    ),
                                );
                                w.terminated();
                            }
                        }
                        break;
                    }
                    Ok(None) => thread::sleep(Duration::from_millis(100)),
                    Err(_) => break,
                }
            });
        }

        Ok(GhciSession {
            child,
            stdin,
            loader,
            suppress_exit,
        })
    }

    pub fn loader(&self) -> &FileLoader {
        &self.loader
    }

    /// Write one raw line to the REPL. Fire-and-forget: whatever the REPL
    /// prints back arrives later on the stdout event channel.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut stdin = self
            .stdin
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdin lock poisoned"))?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()
    }

    /// Tear the process down without emitting a terminated event. Pending
    /// debounced loads are cancelled first.
    pub fn kill(&self) {
        self.suppress_exit.store(true, Ordering::SeqCst);
        self.loader.cancel();
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
        }
    }
}

#[derive(Default)]
struct LoadState {
    /// Bumped on every request and cancel; a sleeper only fires if its
    /// generation is still current when it wakes.
    generation: u64,
    loaded: bool,
    last_content: Option<String>,
}

/// Debounced `:l` writer with a single-slot content cache.
#[derive(Clone)]
pub struct FileLoader {
    stdin: Arc<Mutex<ChildStdin>>,
    writer: SharedWriter,
    state: Arc<Mutex<LoadState>>,
}

impl FileLoader {
    fn new(stdin: Arc<Mutex<ChildStdin>>, writer: SharedWriter) -> Self {
        Self {
            stdin,
            writer,
            state: Arc::new(Mutex::new(LoadState::default())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().map(|s| s.loaded).unwrap_or(false)
    }

    /// Invalidate any pending debounced load.
    pub fn cancel(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.generation += 1;
        }
    }

    /// Schedule a (debounced) reload of `path` into the REPL. Skipped when
    /// the on-disk content matches the last successful load.
    pub fn request_load(&self, path: &Path) {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                self.note(&format!("Error loading file: {}\n", e));
                return;
            }
        };

        let generation = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            // Any pending write is superseded by this request.
            state.generation += 1;

            if state.loaded && state.last_content.as_deref() == Some(content.as_str()) {
                drop(state);
                self.note(&format!(
                    "No changes in {}, skipping reload.\n",
                    path.display()
                ));
                return;
            }

            state.last_content = Some(content);
            state.generation
        };

        if path.extension().and_then(|e| e.to_str()) != Some("hs") {
            self.note("File must be a Haskell source file (.hs)\n");
            return;
        }

        let stdin = self.stdin.clone();
        let writer = self.writer.clone();
        let state = self.state.clone();
        let path = path.to_path_buf();
        thread::spawn(move || {
            thread::sleep(LOAD_DEBOUNCE);

            let mut state = match state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            if state.generation != generation {
                return; // superseded or cancelled
            }

            if let Ok(mut w) = writer.lock() {
                w.output(
                    "console",
                    &format!("Loading Haskell file: {}\n", path.display()),
                );
            }
            if let Ok(mut stdin) = stdin.lock() {
                let _ = stdin.write_all(format!(":l {}\n", path.display()).as_bytes());
                let _ = stdin.flush();
            }
            state.loaded = true;
        });
    }

    fn note(&self, text: &str) {
        if let Ok(mut w) = self.writer.lock() {
            w.output("console", text);
        }
    }
}
