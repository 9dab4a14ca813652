use once_cell::sync::Lazy;
use std::time::{Duration, Instant};

// The single, static reference point for all expiry calculations.
// It is initialized lazily on its first use.
static CACHE_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Nanoseconds elapsed since the cache epoch.
#[inline]
pub(crate) fn now_nanos() -> u64 {
  duration_to_nanos(Instant::now().saturating_duration_since(*CACHE_EPOCH))
}

/// Computes the absolute expiry stamp for a time-to-live measured from now.
///
/// A zero `ttl` yields `0`, the "never expires" sentinel.
#[inline]
pub(crate) fn expiry_from_ttl(ttl: Duration) -> u64 {
  if ttl.is_zero() {
    return 0;
  }
  now_nanos().saturating_add(duration_to_nanos(ttl))
}

#[inline]
fn duration_to_nanos(duration: Duration) -> u64 {
  u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
