// Manual smoke check for the REPL plumbing, outside any editor.
// Run with: cargo run --bin ghci_probe -- "cabal repl --repl-no-load"

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

fn main() -> io::Result<()> {
    let program = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cabal repl --repl-no-load".to_string());

    println!("Spawning: {}", program);

    let argv = shlex::split(&program)
        .unwrap_or_else(|| program.split_whitespace().map(str::to_string).collect());
    let (cmd, rest) = match argv.split_first() {
        Some(parts) => parts,
        None => {
            eprintln!("empty command");
            return Ok(());
        }
    };

    let mut child = Command::new(cmd)
        .args(rest)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("no stdin");
    let stdout = child.stdout.take().expect("no stdout");

    // Print whatever the REPL says for a few seconds.
    let reader = std::thread::spawn(move || {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(Ok(line)) = lines.next() {
            println!("repl> {}", line);
        }
    });

    std::thread::sleep(Duration::from_secs(2));

    println!("Sending probe expression...");
    stdin.write_all(b"1 + 1\n")?;
    stdin.flush()?;

    std::thread::sleep(Duration::from_secs(2));

    println!("Sending :quit");
    stdin.write_all(b":quit\n")?;
    stdin.flush()?;
    drop(stdin);

    let _ = child.wait();
    let _ = reader.join();

    println!("Probe complete.");
    Ok(())
}
