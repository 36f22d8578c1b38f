mod policy;
mod runner;
mod simulate;
mod types;
mod utxo;

pub use policy::derive_policy_id;
pub use runner::{run_cli, run_cli_capture};
pub use simulate::simulate_script;
pub use types::{SimulationContext, Utxo};
pub use utxo::{parse_utxo_json, query_utxos, select_best_utxo};

use thiserror::Error;

/// The simulator is a sequential chain of external CLI calls: the first
/// failing step propagates verbatim, nothing is retried.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("No spendable UTxOs found.\nMake sure the address has ADA and no reference scripts.")]
    NoSpendableUtxos,

    #[error("cardano-cli exited with status {status}: {stderr}")]
    CliFailed { status: i32, stderr: String },

    #[error("failed to run cardano-cli: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected cardano-cli output: {0}")]
    BadOutput(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
