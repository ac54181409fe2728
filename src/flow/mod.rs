pub mod commands;
pub mod controller;
pub mod state;

pub use controller::ScanFlow;
pub use state::{FlowState, LookupFailure};
