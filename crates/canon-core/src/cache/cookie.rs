//! Cookies: opaque liveness tokens for cached query results.
//!
//! The cache only ever holds a cookie weakly. A cached query stays alive
//! while at least one clone of one of its cookies is alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_COOKIE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct CookieToken {
    id: u64,
}

/// Strong handle to a cookie. Clones share the same token.
#[derive(Clone)]
pub struct Cookie(Arc<CookieToken>);

impl Cookie {
    /// Create a fresh cookie.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(CookieToken {
            id: NEXT_COOKIE.fetch_add(1, Ordering::Relaxed),
        }))
    }

    /// Process-unique cookie number, for diagnostics.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub(crate) fn downgrade(&self) -> WeakCookie {
        WeakCookie(Arc::downgrade(&self.0))
    }
}

impl Default for Cookie {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Cookie {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Cookie {}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cookie({})", self.0.id)
    }
}

/// Weak reference to a cookie, as held by a cache entry.
#[derive(Debug, Clone)]
pub(crate) struct WeakCookie(Weak<CookieToken>);

impl WeakCookie {
    pub(crate) fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn refers_to(&self, cookie: &Cookie) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&cookie.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_cookie_dies_with_last_clone() {
        let cookie = Cookie::new();
        let copy = cookie.clone();
        let weak = cookie.downgrade();

        drop(cookie);
        assert!(weak.is_alive());
        assert!(weak.refers_to(&copy));

        drop(copy);
        assert!(!weak.is_alive());
    }

    #[test]
    fn cookies_are_distinct() {
        let a = Cookie::new();
        let b = Cookie::new();
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert!(!a.downgrade().refers_to(&b));
    }
}
