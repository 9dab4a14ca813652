//! Background work for the cache: the janitor thread that periodically
//! reclaims expired entries.

pub(crate) mod janitor;
