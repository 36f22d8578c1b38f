use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;

use super::{Result, SimulatorError};

/// Run cardano-cli to completion and capture stdout. A non-zero exit turns
/// into `CliFailed` with whatever stderr said.
pub fn run_cli_capture(args: &[&str], envs: &[(&str, &str)]) -> Result<String> {
    let output = Command::new("cardano-cli")
        .args(args)
        .envs(envs.iter().copied())
        .output()?;

    if !output.status.success() {
        return Err(SimulatorError::CliFailed {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Streaming variant: forward stdout/stderr chunks to the callbacks as they
/// arrive and return the exit code.
pub fn run_cli<F, G>(cli_path: &str, args: &[String], on_stdout: F, on_stderr: G) -> io::Result<i32>
where
    F: FnMut(&str) + Send,
    G: FnMut(&str) + Send,
{
    let mut child = Command::new(cli_path)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        if let Some(out) = stdout {
            scope.spawn(move || pump(out, on_stdout));
        }
        if let Some(err) = stderr {
            scope.spawn(move || pump(err, on_stderr));
        }
    });

    let status = child.wait()?;
    Ok(status.code().unwrap_or(0))
}

fn pump<R: Read, F: FnMut(&str)>(mut reader: R, mut f: F) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => f(&String::from_utf8_lossy(&buf[..n])),
        }
    }
}
