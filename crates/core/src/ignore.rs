//! Exclude rules applied while snapshotting a root
//!
//! Two optional sources, both gitignore syntax relative to the root:
//! 1. Configured patterns (highest priority, may whitelist with `!`)
//! 2. The root's own `.gitignore`

use anyhow::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Exclude rules for one root
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    /// Patterns from configuration (optional)
    patterns: Option<Gitignore>,

    /// The root's `.gitignore` (optional)
    gitignore: Option<Gitignore>,
}

impl IgnoreRules {
    /// Load exclude rules for a root
    pub fn load(root: &Path, config: &IgnoreConfig) -> Result<Self> {
        let patterns = if config.patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(root);
            for pattern in &config.patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        let gitignore = if config.use_gitignore {
            let gitignore_path = root.join(".gitignore");
            if gitignore_path.is_file() {
                let mut builder = GitignoreBuilder::new(root);
                if let Some(err) = builder.add(&gitignore_path) {
                    return Err(err.into());
                }
                Some(builder.build()?)
            } else {
                None
            }
        } else {
            None
        };

        Ok(Self {
            patterns,
            gitignore,
        })
    }

    /// Check that every pattern parses
    pub fn check_patterns(patterns: &[String]) -> Result<()> {
        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            builder.add_line(None, pattern)?;
        }
        builder.build()?;
        Ok(())
    }

    /// Check if a path (relative to the root) should be excluded
    pub fn should_ignore(&self, relative: &Path, is_dir: bool) -> bool {
        if let Some(ref patterns) = self.patterns {
            match patterns.matched(relative, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }

        if let Some(ref gitignore) = self.gitignore {
            return gitignore.matched(relative, is_dir).is_ignore();
        }

        false
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        usize::from(self.patterns.is_some()) + usize::from(self.gitignore.is_some())
    }
}

/// Ignore configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Honour the root's `.gitignore` (default: false)
    #[serde(default)]
    pub use_gitignore: bool,

    /// Additional gitignore-style patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl IgnoreConfig {
    /// Check whether any source could exclude something
    pub fn is_active(&self) -> bool {
        self.use_gitignore || !self.patterns.is_empty()
    }
}
