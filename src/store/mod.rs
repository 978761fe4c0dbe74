pub mod sharded;

pub use sharded::{ScanResult, ShardedStore};
