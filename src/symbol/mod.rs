//! Symbol resolution module
//!
//! Styles reference external symbol assets (marker graphics) by string.
//! This module resolves those references exactly once per (style,
//! reference) pair and serves the cached content on every later lookup,
//! regardless of resolver or filesystem changes in between.
//!
//! Resolution order: the style's own [`SymbolResolver`] callback if
//! configured, then the injected [`SearchPaths`] directory list. A miss is
//! never fatal — renderers substitute a placeholder symbol.

mod cache;

pub use cache::{ResolutionCache, Symbol};

use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Capability for mapping a symbol reference string to its content.
///
/// Implementations must be callable from multiple threads; resolution for
/// the same reference should be idempotent.
pub trait SymbolResolver: Send + Sync {
    /// Resolves a reference to raw symbol content, or `None` on a miss.
    fn resolve(&self, reference: &str) -> Option<Vec<u8>>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    fn resolve(&self, reference: &str) -> Option<Vec<u8>> {
        self(reference)
    }
}

#[derive(Debug, Default)]
struct SearchPathsInner {
    dirs: RwLock<Vec<PathBuf>>,
    generation: AtomicU64,
}

/// Ordered symbol search directories, shared by handle.
///
/// This is the injected replacement for process-global search-path state:
/// clones share the same list, and every reconfiguration bumps a
/// generation counter that invalidates search-path-backed cache entries.
/// Callers are responsible for serializing reconfiguration against
/// in-flight renders.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    inner: Arc<SearchPathsInner>,
}

impl SearchPaths {
    /// Creates an empty search-path list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the directory list.
    pub fn set(&self, dirs: Vec<PathBuf>) {
        let mut guard = self.inner.dirs.write();
        *guard = dirs;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Symbol search paths reconfigured");
    }

    /// Clears the directory list.
    pub fn reset(&self) {
        self.set(Vec::new());
    }

    /// Current reconfiguration generation.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Snapshot of the configured directories.
    pub fn dirs(&self) -> Vec<PathBuf> {
        self.inner.dirs.read().clone()
    }

    /// Reads the first matching file across the directory list.
    pub(crate) fn lookup(&self, reference: &str) -> Option<Vec<u8>> {
        let dirs = self.inner.dirs.read();
        for dir in dirs.iter() {
            let candidate = dir.join(reference);
            if let Ok(content) = std::fs::read(&candidate) {
                debug!(reference, path = %candidate.display(), "Symbol resolved via search path");
                return Some(content);
            }
        }
        None
    }
}

/// Errors raised for malformed resolver input.
///
/// Missing assets are not errors — they resolve to [`Symbol::Unresolved`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// Reference string is empty
    #[error("Symbol reference is empty")]
    EmptyReference,

    /// Reference string contains bytes a path can never hold
    #[error("Malformed symbol reference: {0:?}")]
    InvalidReference(String),
}
