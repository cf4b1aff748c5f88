pub mod binary;
pub mod text;

/// Highest snapshot schema version this build understands. Snapshots with a
/// greater version are rejected on load.
pub const SNAPSHOT_VERSION: u32 = 1;
