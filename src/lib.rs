pub mod dap;
pub mod debugger;
pub mod diagnostics;
pub mod parser;
pub mod simulator;
