use std::path::PathBuf;

/// Inputs for one cost-simulation run.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub plutus_file: PathBuf,
    pub socket_path: String,
    pub sender_address: String,
    pub testnet_magic: u32,
    pub redeemer_json: String,
    pub asset_name: String,
}

/// One unspent output as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub tx_hash: String,
    pub index: u32,
    pub lovelace: u64,
}
