//! Service lifetime definitions.

use std::fmt;

/// Cache lifetime of a service instance.
///
/// In a call-site plan the lifetime shows up as the caching wrapper around an
/// inner strategy: `Singleton`, `Scoped` and `Transient` call sites each
/// correspond to one of these values (see [`CallSite::cache_lifetime`]).
///
/// Only `Scoped` affects code generation: a plan containing a scoped cache
/// needs the scope lock around lazy instance creation.
///
/// [`CallSite::cache_lifetime`]: crate::CallSite::cache_lifetime
///
/// # Examples
///
/// ```rust
/// use ferrous_callsite::{CallSite, Lifetime, key_of_type};
///
/// struct RequestContext;
///
/// let key = key_of_type::<RequestContext>();
/// let site = CallSite::scoped(key.clone(), CallSite::create_instance(key, "RequestContext"));
/// assert_eq!(site.cache_lifetime(), Some(Lifetime::Scoped));
/// assert!(Lifetime::Scoped.is_scope_bound());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "graph-export", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    Singleton,
    /// Single instance per scope, cached for the scope lifetime
    ///
    /// Creation happens lazily on first access inside the scope, which is
    /// where concurrent first access has to be serialized.
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Returns true for lifetimes whose instances live in a scope cache.
    pub fn is_scope_bound(self) -> bool {
        matches!(self, Lifetime::Scoped)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}
