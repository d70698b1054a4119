//! Runtime configuration for a ferrocoin node.
//!
//! The [`Config`] struct centralises the per-run tunables: proof-of-work
//! difficulty, the height the node mines toward before reporting its final
//! state, and the protocol version string it announces. It is constructed
//! via the [`ConfigBuilder`] using the fluent builder pattern so callers
//! customise only the fields they care about.
//!
//! ```
//! use ferrocoin_core::config::ConfigBuilder;
//!
//! let cfg = ConfigBuilder::new().difficulty(2).target_height(4).finish();
//! assert_eq!(cfg.difficulty, 2);
//! ```

use serde::{Deserialize, Serialize};

/// Runtime configuration shared across the node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Leading ASCII-zero bytes a block hash must carry.
    pub difficulty: usize,

    /// The node runs until its best head reaches this height.
    pub target_height: u64,

    /// Version string announced in the handshake.
    pub protocol_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: 1,
            target_height: 3,
            protocol_version: "ferrocoin/0.1".into(),
        }
    }
}

/// Fluent builder for [`Config`].
pub struct ConfigBuilder {
    inner: Config,
}

impl ConfigBuilder {
    /// Starts a new builder pre-populated with [`Config::default`].
    pub fn new() -> Self {
        Self {
            inner: Config::default(),
        }
    }

    pub fn difficulty(mut self, difficulty: usize) -> Self {
        self.inner.difficulty = difficulty;
        self
    }

    pub fn target_height(mut self, height: u64) -> Self {
        self.inner.target_height = height;
        self
    }

    pub fn protocol_version<S: Into<String>>(mut self, version: S) -> Self {
        self.inner.protocol_version = version.into();
        self
    }

    /// Consumes the builder returning an immutable configuration value.
    pub fn finish(self) -> Config {
        self.inner
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
