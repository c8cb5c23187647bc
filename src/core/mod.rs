//! 核心存储

pub mod store;

pub use store::Store;
