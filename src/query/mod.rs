pub mod explain;
pub mod filter;
pub mod operator;
pub mod regex_cache;
