//! SID to account-name cache.
//!
//! A [`SidNameCache`] is an explicit value: create one per component, or share the
//! process-wide instance from [`SidNameCache::global`]. Misses are resolved through a
//! [`SidNameResolver`] supplied by the caller and stored for later lookups.
//!
//! ```rust
//! use win_security_descriptor::sid_cache::{SidNameCache, SidNameSource, WellKnownSidResolver};
//! use win_security_descriptor::well_known;
//!
//! let cache = SidNameCache::new();
//! let name = cache.lookup(&well_known::LOCAL_SYSTEM, &WellKnownSidResolver, false).unwrap();
//! assert_eq!(name.account.to_string(), "NT AUTHORITY\\SYSTEM");
//! assert_eq!(name.source, SidNameSource::WellKnown);
//! assert_eq!(cache.len(), 1);
//! ```

#[cfg(windows)]
mod windows;

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::SystemTime;

use cfg_if::cfg_if;
use log::debug;
use parking_lot::RwLock;

use crate::{DomainAndName, Sid, SidType, well_known};

#[cfg(windows)]
pub use windows::{AccountSidResolver, LookupError};

/// Where a cached name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SidNameSource {
    /// The built-in table of well-known SIDs.
    WellKnown,
    /// An account lookup against the operating system.
    Account,
    /// Inserted by the caller.
    Manual,
}

/// A resolved account name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidName {
    /// `DOMAIN\Name` of the account.
    pub account: DomainAndName,
    /// How the name was obtained.
    pub source: SidNameSource,
    /// Account kind, when the source reports one.
    pub sid_type: Option<SidType>,
    /// When the name was resolved.
    pub cached_at: SystemTime,
}

impl SidName {
    /// A name resolved now.
    #[inline]
    #[must_use]
    pub fn new(account: DomainAndName, source: SidNameSource, sid_type: Option<SidType>) -> Self {
        Self {
            account,
            source,
            sid_type,
            cached_at: SystemTime::now(),
        }
    }
}

/// Fallback used on cache misses.
pub trait SidNameResolver {
    /// Resolves `sid`, or `None` when it has no known name.
    fn resolve(&self, sid: &Sid) -> Option<SidName>;
}

impl<F> SidNameResolver for F
where
    F: Fn(&Sid) -> Option<SidName>,
{
    #[inline]
    fn resolve(&self, sid: &Sid) -> Option<SidName> {
        self(sid)
    }
}

/// Tries the first resolver, then the second.
impl<A, B> SidNameResolver for (A, B)
where
    A: SidNameResolver,
    B: SidNameResolver,
{
    #[inline]
    fn resolve(&self, sid: &Sid) -> Option<SidName> {
        self.0.resolve(sid).or_else(|| self.1.resolve(sid))
    }
}

cfg_if! {
    if #[cfg(windows)] {
        /// Resolver of [`SidNameCache::resolve`]: the account database, then the well-known table.
        pub type DefaultSidResolver = (AccountSidResolver, WellKnownSidResolver);
    } else {
        /// Resolver of [`SidNameCache::resolve`]: the well-known table.
        pub type DefaultSidResolver = WellKnownSidResolver;
    }
}

/// Resolves the well-known SIDs of [`well_known`] without touching the system.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellKnownSidResolver;

impl SidNameResolver for WellKnownSidResolver {
    #[inline]
    fn resolve(&self, sid: &Sid) -> Option<SidName> {
        well_known::well_known_name(sid).map(|known| {
            SidName::new(
                DomainAndName::new(known.domain, known.name),
                SidNameSource::WellKnown,
                Some(known.sid_type),
            )
        })
    }
}

/// Thread-safe map from SID to resolved name.
#[derive(Debug, Default)]
pub struct SidNameCache {
    entries: RwLock<HashMap<Sid, SidName>>,
}

impl SidNameCache {
    /// An empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, created on first use.
    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<SidNameCache> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// The cached name of `sid`.
    #[inline]
    #[must_use]
    pub fn get(&self, sid: &Sid) -> Option<SidName> {
        self.entries.read().get(sid).cloned()
    }

    /// Stores `name` for `sid`, returning the previous entry.
    #[inline]
    pub fn insert(&self, sid: Sid, name: SidName) -> Option<SidName> {
        self.entries.write().insert(sid, name)
    }

    /// Drops the entry of `sid`.
    #[inline]
    pub fn remove(&self, sid: &Sid) -> Option<SidName> {
        self.entries.write().remove(sid)
    }

    /// The name of `sid`, from the cache or else from `resolver`.
    ///
    /// Resolved names are stored. With `bypass_cache` the cached entry is ignored and
    /// replaced by a fresh resolution; when that resolution fails, the stale entry is kept.
    #[inline]
    pub fn lookup<R>(&self, sid: &Sid, resolver: &R, bypass_cache: bool) -> Option<SidName>
    where
        R: SidNameResolver + ?Sized,
    {
        if !bypass_cache && let Some(hit) = self.get(sid) {
            debug!("SID name cache hit for {sid}");
            return Some(hit);
        }
        debug!("SID name cache miss for {sid}");
        let resolved = resolver.resolve(sid)?;
        let mut entries = self.entries.write();
        if bypass_cache {
            entries.insert(*sid, resolved.clone());
            return Some(resolved);
        }
        // Another thread may have resolved the same SID in the meantime.
        Some(entries.entry(*sid).or_insert(resolved).clone())
    }

    /// [`SidNameCache::lookup`] with the platform's [`DefaultSidResolver`].
    #[inline]
    pub fn resolve(&self, sid: &Sid) -> Option<SidName> {
        self.lookup(sid, &DefaultSidResolver::default(), false)
    }

    /// Empties the cache.
    #[inline]
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        debug!("clearing {} cached SID names", entries.len());
        entries.clear();
    }

    /// Number of cached names.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
