use crate::error::BuildError;
use crate::handle::Cache;
use crate::listener::EvictionListener;
use crate::shared::CacheShared;

use core::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// The janitor tick used when none is configured.
pub const DEFAULT_JANITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Declarative cache settings, e.g. loaded from an application config file.
///
/// With the `serde` feature, `janitor_interval` is read and written as a
/// human-readable duration such as `"100ms"` or `"5m"`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct CacheConfig {
  /// How often the janitor sweeps expired entries.
  #[cfg_attr(feature = "serde", serde(with = "humantime_duration"))]
  pub janitor_interval: Duration,
  /// Cost budget. Zero or less disables cost eviction.
  pub max_cost: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      janitor_interval: DEFAULT_JANITOR_INTERVAL,
      max_cost: 0,
    }
  }
}

#[cfg(feature = "serde")]
mod humantime_duration {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub(super) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*duration))
  }

  pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
  }
}

/// A builder for creating [`Cache`] instances.
pub struct CacheBuilder<K, V> {
  pub(crate) janitor_interval: Duration,
  pub(crate) max_cost: i64,
  listener: Option<Arc<dyn EvictionListener<K, V>>>,
  _marker: PhantomData<fn() -> (K, V)>,
}

// Manual Debug implementation for CacheBuilder.
impl<K, V> fmt::Debug for CacheBuilder<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheBuilder")
      .field("janitor_interval", &self.janitor_interval)
      .field("max_cost", &self.max_cost)
      .field("has_listener", &self.listener.is_some())
      .finish()
  }
}

impl<K, V> Default for CacheBuilder<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

// --- General Configuration Methods ---
// This impl block has no restrictive bounds on K or V.
impl<K, V> CacheBuilder<K, V> {
  /// Creates a new `CacheBuilder` with default settings: a one second
  /// janitor tick and no cost budget.
  pub fn new() -> Self {
    Self {
      janitor_interval: DEFAULT_JANITOR_INTERVAL,
      max_cost: 0,
      listener: None,
      _marker: PhantomData,
    }
  }

  /// Starts from declarative settings.
  pub fn from_config(config: &CacheConfig) -> Self {
    Self::new()
      .janitor_interval(config.janitor_interval)
      .max_cost(config.max_cost)
  }

  /// Sets how often the background janitor sweeps expired entries.
  pub fn janitor_interval(mut self, interval: Duration) -> Self {
    self.janitor_interval = interval;
    self
  }

  /// Sets the maximum total cost of the cache. Zero or less disables cost
  /// eviction.
  pub fn max_cost(mut self, max_cost: i64) -> Self {
    self.max_cost = max_cost;
    self
  }

  /// Disables cost eviction.
  pub fn unbounded(mut self) -> Self {
    self.max_cost = 0;
    self
  }

  /// Sets the eviction listener for the cache.
  ///
  /// The cache owns the listener. A listener that captures a strong
  /// [`Cache`] handle to its own cache forms a reference cycle: dropping every
  /// other handle then no longer stops the janitor. Capture a
  /// [`WeakCache`](crate::WeakCache) from [`Cache::downgrade`] instead, or
  /// call [`Cache::close`] explicitly.
  pub fn eviction_listener<Listener>(mut self, listener: Listener) -> Self
  where
    Listener: EvictionListener<K, V> + 'static,
  {
    self.listener = Some(Arc::new(listener));
    self
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.janitor_interval.is_zero() {
      return Err(BuildError::ZeroJanitorInterval);
    }
    Ok(())
  }
}

// --- Build Methods ---
impl<K, V> CacheBuilder<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + Sync + 'static,
{
  /// Builds the cache and starts its janitor thread.
  pub fn build(self) -> Result<Cache<K, V>, BuildError> {
    self.validate()?;
    let shared = CacheShared::new(self.janitor_interval, self.max_cost, self.listener)?;
    debug!(
      janitor_interval = ?self.janitor_interval,
      max_cost = self.max_cost,
      "cache built"
    );
    Ok(Cache {
      shared: Some(Arc::new(shared)),
    })
  }
}
