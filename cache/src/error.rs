use thiserror::Error;

/// Errors that can occur when building a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The janitor was configured to wake every zero seconds.
  #[error("janitor interval cannot be zero")]
  ZeroJanitorInterval,

  /// The operating system refused to start the janitor thread.
  #[error("failed to spawn the janitor thread: {0}")]
  JanitorSpawn(String),
}
