pub mod common;
pub mod order;
pub mod pagination;

pub use common::*;
pub use order::*;
pub use pagination::*;
