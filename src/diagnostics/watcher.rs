use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use super::engine::{BatchStatus, DiagnosticsEngine};

/// Where the build watcher stands, in place of an editor status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Idle,
    Running,
    AllGood,
    Errors,
    Failed,
    Stopped,
}

/// Owns the long-running `ghcid` process and feeds its stdout into the
/// diagnostics engine. One watcher per workspace; starting a new process
/// always kills the previous one first.
pub struct BuildWatcher {
    engine: Arc<Mutex<DiagnosticsEngine>>,
    child: Option<Arc<Mutex<Child>>>,
    status: Arc<Mutex<WatchStatus>>,
}

impl BuildWatcher {
    pub fn new(engine: Arc<Mutex<DiagnosticsEngine>>) -> Self {
        Self {
            engine,
            child: None,
            status: Arc::new(Mutex::new(WatchStatus::Idle)),
        }
    }

    pub fn status(&self) -> WatchStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(WatchStatus::Failed)
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawn ghcid if it is not already watching.
    pub fn ensure_running(&mut self, workspace_root: &Path) -> io::Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        self.start(workspace_root)
    }

    pub fn start(&mut self, workspace_root: &Path) -> io::Result<()> {
        self.stop();

        let mut child = match Command::new("ghcid")
            .args(["--command", "cabal repl"])
            .current_dir(workspace_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                self.set_status(WatchStatus::Failed);
                return Err(e);
            }
        };

        self.set_status(WatchStatus::Running);

        if let Some(mut out) = child.stdout.take() {
            let engine = self.engine.clone();
            let status = self.status.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match out.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let text = String::from_utf8_lossy(&buf[..n]).to_string();
                            let outcome = match engine.lock() {
                                Ok(mut engine) => engine.process_chunk(&text),
                                Err(_) => break,
                            };
                            let next = match outcome {
                                BatchStatus::AllGood => Some(WatchStatus::AllGood),
                                BatchStatus::Diagnostics => Some(WatchStatus::Errors),
                                BatchStatus::Quiet => None,
                            };
                            if let (Some(next), Ok(mut status)) = (next, status.lock()) {
                                *status = next;
                            }
                        }
                    }
                }
                if let Ok(mut status) = status.lock() {
                    *status = WatchStatus::Stopped;
                }
            });
        }

        if let Some(mut err) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match err.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => eprintln!("ghcid stderr: {}", String::from_utf8_lossy(&buf[..n])),
                    }
                }
            });
        }

        self.child = Some(Arc::new(Mutex::new(child)));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(child) = self.child.take() {
            if let Ok(mut child) = child.lock() {
                let _ = child.kill();
            }
        }
        self.set_status(WatchStatus::Stopped);
    }

    fn set_status(&self, status: WatchStatus) {
        if let Ok(mut slot) = self.status.lock() {
            *slot = status;
        }
    }
}

impl Drop for BuildWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// True when a usable `ghcid` binary is on the PATH.
pub fn check_ghcid_installed() -> bool {
    Command::new("ghcid")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
