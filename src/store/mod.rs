pub mod flatten;
pub mod reaper;
pub mod table;
