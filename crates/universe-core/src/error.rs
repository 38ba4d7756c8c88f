//! Error type shared by generation, directory access and configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    /// Generation tried to place more bodies than the store can hold.
    #[error("thing store is full ({capacity} slots)")]
    CapacityExceeded { capacity: usize },

    /// Thing indices are `u16`, so a store can never hold more than 65536 slots.
    #[error("invalid thing store capacity {requested} (must be 1..=65536)")]
    InvalidCapacity { requested: usize },

    #[error("thing index {index} out of range (universe holds {len} things)")]
    InvalidIndex { index: u16, len: usize },

    /// A generation policy returned without popping every thing it pushed.
    #[error("generation policy left the cursor at thing {cursor} instead of the root")]
    UnbalancedCursor { cursor: u16 },

    #[error("thing {index} has no tile surface")]
    NotASurface { index: u16 },

    #[error("entity is not a tile-bound object")]
    UnknownEntity,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UniverseError>;
