/// Tunables shared by parsing and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum sub-expression nesting before parsing fails with
    /// `NestingTooDeep`.
    pub max_depth: usize,

    /// Characters kept either side of the failure offset in error snippets.
    pub snippet_radius: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            max_depth: 256,
            snippet_radius: 40,
        }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_snippet_radius(mut self, snippet_radius: usize) -> Self {
        self.snippet_radius = snippet_radius;
        self
    }
}
