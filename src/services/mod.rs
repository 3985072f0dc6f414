pub mod erp;
pub mod export;
pub mod import;
pub mod run_state;
pub mod transfer;

pub use run_state::RunState;
