pub mod async_helper;
pub mod error_handling;
pub mod http;
pub mod liked_store;

// Re-export commonly used types
pub use liked_store::{LikedStickersDB, LikedStore, MemoryLikedStore};
