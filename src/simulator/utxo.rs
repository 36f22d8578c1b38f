use super::runner::run_cli_capture;
use super::types::Utxo;
use super::{Result, SimulatorError};

/// Ask the node for the address's UTxO set as JSON and parse it.
pub fn query_utxos(address: &str, testnet_magic: u32, socket_path: &str) -> Result<Vec<Utxo>> {
    let magic = testnet_magic.to_string();
    let stdout = run_cli_capture(
        &[
            "query",
            "utxo",
            "--address",
            address,
            "--testnet-magic",
            &magic,
            "--output-json",
        ],
        &[("CARDANO_NODE_SOCKET_PATH", socket_path)],
    )?;

    parse_utxo_json(&stdout)
}

/// Parse `cardano-cli query utxo --output-json` output: entries are keyed
/// `txhash#index`. Outputs without a lovelace value and outputs carrying a
/// reference script are not spendable here and get skipped.
pub fn parse_utxo_json(json: &str) -> Result<Vec<Utxo>> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    let mut utxos = Vec::new();

    let entries = match parsed.as_object() {
        Some(entries) => entries,
        None => return Ok(utxos),
    };

    for (key, entry) in entries {
        let (tx_hash, index) = match key.split_once('#') {
            Some((hash, index)) => (hash, index),
            None => (key.as_str(), "0"),
        };

        let lovelace = match entry
            .pointer("/value/lovelace")
            .and_then(|v| v.as_u64())
            .filter(|&l| l > 0)
        {
            Some(lovelace) => lovelace,
            None => continue,
        };

        if !entry.get("referenceScript").is_some_and(|v| v.is_null()) {
            continue;
        }

        utxos.push(Utxo {
            tx_hash: tx_hash.to_string(),
            index: index.parse().unwrap_or(0),
            lovelace,
        });
    }

    Ok(utxos)
}

/// The UTxO with the most lovelace; first wins on a tie.
pub fn select_best_utxo(utxos: &[Utxo]) -> Result<&Utxo> {
    let mut best = match utxos.first() {
        Some(utxo) => utxo,
        None => return Err(SimulatorError::NoSpendableUtxos),
    };

    for utxo in &utxos[1..] {
        if utxo.lovelace > best.lovelace {
            best = utxo;
        }
    }

    Ok(best)
}
