//! Pseudo-terminal settings.

/// Configuration for the pseudo-terminal a child is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Size of each blocking read from the terminal.
    pub read_chunk_size: usize,

    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            read_chunk_size: 4096,
            terminal_width: 511,
            terminal_height: 24,
        }
    }
}

impl PtyConfig {
    /// Set terminal dimensions.
    pub fn with_size(mut self, width: u16, height: u16) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the pattern search depth.
    pub fn with_search_depth(mut self, search_depth: usize) -> Self {
        self.search_depth = search_depth;
        self
    }
}
