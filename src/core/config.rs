use std::time::Duration;

/// Default capacity of the shared compiled-pattern cache.
pub const DEFAULT_MAX_REGEX_CACHE: usize = 1000;

#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Applied uniformly to every inserted row.
    pub ttl: Duration,
    pub max_regex_cache: usize,
}

impl TableOptions {
    pub fn new(ttl: Duration) -> Self {
        TableOptions {
            ttl,
            max_regex_cache: DEFAULT_MAX_REGEX_CACHE,
        }
    }

    /// Zero retains the default capacity.
    pub fn with_max_regex_cache(mut self, capacity: usize) -> Self {
        if capacity > 0 {
            self.max_regex_cache = capacity;
        }
        self
    }
}
