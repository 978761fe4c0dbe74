pub mod debug;
pub mod order;

pub use debug::debug_config;
pub use order::order_config;
