//! # meshsmooth algorithms
//!
//! The geometry stages that run before reconstruction:
//! triangle soup deduplication, vertex normal accumulation, adjacency graph
//! construction, and the randomized seed/neighbor vertex partition.

pub mod dedup;
pub mod normals;
pub mod adjacency;
pub mod partition;

// Re-export commonly used items
pub use dedup::*;
pub use normals::*;
pub use adjacency::*;
pub use partition::*;
