use std::path::Path;
use std::time::Instant;

use serde_json::json;

use super::policy::derive_policy_id;
use super::runner::run_cli_capture;
use super::types::SimulationContext;
use super::utxo::{query_utxos, select_best_utxo};
use super::Result;

fn to_hex(s: &str) -> String {
    s.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// Build a zero-fee minting transaction against a real UTxO and ask the node
/// what the script execution would cost. Returns a pretty JSON report with
/// the CLI's cost breakdown plus wall-clock timing of the cost query.
pub fn simulate_script(ctx: &SimulationContext) -> Result<String> {
    let work_dir = ctx.plutus_file.parent().unwrap_or_else(|| Path::new("."));
    let tx_raw = work_dir.join("tx.raw");

    // Step 1: pick a funding UTxO.
    let utxos = query_utxos(&ctx.sender_address, ctx.testnet_magic, &ctx.socket_path)?;
    let utxo = select_best_utxo(&utxos)?.clone();

    // Step 2: policy id for the minting script.
    let policy_id = derive_policy_id(&ctx.plutus_file)?;

    // Step 3: asset name from the caller, hex-encoded.
    let asset = format!("{}.{}", policy_id, to_hex(&ctx.asset_name));

    // Step 4: raw minting transaction, zero fee, placeholder execution units.
    let plutus = ctx.plutus_file.to_string_lossy();
    let tx_raw_path = tx_raw.to_string_lossy();
    let magic = ctx.testnet_magic.to_string();

    run_cli_capture(
        &[
            "conway",
            "transaction",
            "build-raw",
            "--script-valid",
            "--tx-in",
            &format!("{}#{}", utxo.tx_hash, utxo.index),
            "--mint",
            &format!("1 {}", asset),
            "--mint-script-file",
            plutus.as_ref(),
            "--mint-redeemer-value",
            &ctx.redeemer_json,
            "--mint-execution-units",
            "(0,0)",
            "--tx-out",
            &format!("{}+2000000+1 {}", ctx.sender_address, asset),
            "--fee",
            "0",
            "--out-file",
            tx_raw_path.as_ref(),
        ],
        &[("CARDANO_NODE_SOCKET_PATH", &ctx.socket_path)],
    )?;

    // Step 5: ask the node for the actual Plutus cost, timed.
    let started = Instant::now();
    let stdout = run_cli_capture(
        &[
            "conway",
            "transaction",
            "calculate-plutus-script-cost",
            "online",
            "--tx-file",
            tx_raw_path.as_ref(),
            "--testnet-magic",
            &magic,
        ],
        &[("CARDANO_NODE_SOCKET_PATH", &ctx.socket_path)],
    )?;
    let timing_ms = started.elapsed().as_secs_f64() * 1000.0;

    let result: serde_json::Value = serde_json::from_str(&stdout)?;
    let report = json!({
        "result": result,
        "timingMs": (timing_ms * 1000.0).round() / 1000.0,
    });

    Ok(serde_json::to_string_pretty(&report)?)
}
