pub mod error;
pub mod executor;
pub mod loader;
