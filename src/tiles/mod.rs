pub mod constants;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use store::{StoreError, TileStore, TileStoreStats};
pub use types::{ColorChannel, TileColor, TilePos, TileRecord};
