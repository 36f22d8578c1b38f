use std::path::Path;

use super::runner::run_cli_capture;
use super::Result;

/// Derive the minting policy id for a Plutus script file.
pub fn derive_policy_id(plutus_file: &Path) -> Result<String> {
    let script = plutus_file.to_string_lossy();
    let stdout = run_cli_capture(
        &[
            "conway",
            "transaction",
            "policyid",
            "--script-file",
            script.as_ref(),
        ],
        &[],
    )?;

    Ok(stdout.trim().to_string())
}
