/// Include nesting allowed below the top-level input
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

/// Macro expansions allowed to be active at once
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 10;

/// What to do when `define` names a macro that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redefinition {
    /// Fail with [`crate::ExpandError::Redefinition`]
    #[default]
    Reject,
    /// Replace the earlier definition and log a warning
    Replace,
}

/// Limits and policies of an expansion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_include_depth: usize,
    pub max_expansion_depth: usize,
    pub redefinition: Redefinition,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            redefinition: Redefinition::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    #[must_use]
    pub fn with_redefinition(mut self, policy: Redefinition) -> Self {
        self.redefinition = policy;
        self
    }
}
