use std::io;

use haskell_debugger::dap;
use haskell_debugger::diagnostics;

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--check-env") {
        return run_env_check();
    }

    eprintln!("Starting in DAP mode...");
    dap::run_dap_mode()
}

fn run_env_check() -> io::Result<()> {
    if diagnostics::check_ghcid_installed() {
        eprintln!("ghcid is installed");
    } else {
        eprintln!(
            "\"ghcid\" is not installed. Diagnostics and live error checking will be \
             unavailable. Install it via `cabal install ghcid` or `stack install ghcid`."
        );
    }
    Ok(())
}
