//! esshovel: bulk transfer and resharding for Elasticsearch indices
//!
//! Moves documents between an index and local line-delimited files, and
//! uses that to reshard an index in place: export everything to a spill
//! file, verify the copy, delete the index, re-import it with different
//! shard/replica settings, verify the count again.

pub mod client;
pub mod error;
pub mod export;
pub mod import;
pub mod mapping;
pub mod progress;
pub mod reshard;

pub use client::EsClient;
pub use error::{Error, Result};
pub use export::export;
pub use import::{import, ImportOptions};
pub use progress::TransferProgress;
pub use reshard::{reshard, ReshardOptions};
