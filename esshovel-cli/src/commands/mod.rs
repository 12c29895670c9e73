pub mod export;
pub mod import;
pub mod reshard;

pub use export::run_export;
pub use import::run_import;
pub use reshard::run_reshard;
