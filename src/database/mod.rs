pub mod connection;

pub use connection::{DbPool, create_shard_pools, init_schema};
