//! Per-style resolution cache.
//!
//! Maps a reference string to resolved symbol content. Resolution is a
//! one-time side-effecting operation: once a reference has been resolved
//! within a style's cache, later renders reuse the stored content even if
//! the backing file disappears. The only invalidation paths are dropping
//! the owning style and reconfiguring the search-path list, which voids
//! search-path-backed entries (resolver-backed content survives, since it
//! is not path-dependent).

use crate::symbol::{ResolutionError, SearchPaths, SymbolResolver};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

/// Outcome of resolving a symbol reference.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// Resolved content bytes, shared with the cache
    Content(Arc<[u8]>),
    /// No match anywhere; renderers draw the placeholder symbol
    Unresolved,
}

impl Symbol {
    /// Resolved bytes, or `None` for the unresolved sentinel.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Symbol::Content(bytes) => Some(bytes),
            Symbol::Unresolved => None,
        }
    }
}

/// How an entry was produced, for selective invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
    /// Style's resolver callback; immune to search-path changes
    Resolver,
    /// Search-path fallback (or a full miss) at the recorded generation
    SearchPath { generation: u64 },
}

#[derive(Debug, Clone)]
struct CachedSymbol {
    symbol: Symbol,
    via: Via,
}

impl CachedSymbol {
    fn is_stale(&self, current_generation: u64) -> bool {
        matches!(self.via, Via::SearchPath { generation } if generation != current_generation)
    }
}

/// Concurrent reference → content cache owned by one style.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<String, CachedSymbol>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a reference, serving the cache when possible.
    ///
    /// Only malformed input errors; a missing asset returns
    /// [`Symbol::Unresolved`]. Concurrent first-time resolutions of the
    /// same key are safe: the first writer wins and every caller gets
    /// internally consistent content.
    pub fn resolve(
        &self,
        reference: &str,
        resolver: Option<&dyn SymbolResolver>,
        paths: &SearchPaths,
    ) -> Result<Symbol, ResolutionError> {
        if reference.trim().is_empty() {
            return Err(ResolutionError::EmptyReference);
        }
        if reference.contains('\0') {
            return Err(ResolutionError::InvalidReference(reference.to_string()));
        }

        let current_generation = paths.generation();

        if let Some(entry) = self.entries.get(reference) {
            if !entry.is_stale(current_generation) {
                return Ok(entry.symbol.clone());
            }
        }

        // Resolve outside any map lock; the entry API below arbitrates
        // concurrent writers.
        let fresh = self.resolve_uncached(reference, resolver, paths, current_generation);

        match self.entries.entry(reference.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                if occupied.get().is_stale(current_generation) {
                    occupied.insert(fresh.clone());
                    Ok(fresh.symbol)
                } else {
                    // Another thread won the race; serve its result.
                    Ok(occupied.get().symbol.clone())
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(fresh.clone());
                Ok(fresh.symbol)
            }
        }
    }

    fn resolve_uncached(
        &self,
        reference: &str,
        resolver: Option<&dyn SymbolResolver>,
        paths: &SearchPaths,
        generation: u64,
    ) -> CachedSymbol {
        if let Some(resolver) = resolver {
            if let Some(content) = resolver.resolve(reference) {
                return CachedSymbol {
                    symbol: Symbol::Content(content.into()),
                    via: Via::Resolver,
                };
            }
        }

        match paths.lookup(reference) {
            Some(content) => CachedSymbol {
                symbol: Symbol::Content(content.into()),
                via: Via::SearchPath { generation },
            },
            None => {
                warn!(reference, "Symbol reference unresolved, placeholder will be used");
                CachedSymbol {
                    symbol: Symbol::Unresolved,
                    via: Via::SearchPath { generation },
                }
            }
        }
    }

    /// Number of cached references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
