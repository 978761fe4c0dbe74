pub mod id_allocator;
pub mod resolver;

pub use id_allocator::OrderIdAllocator;
pub use resolver::{ShardKeyResolver, ShardTarget};
