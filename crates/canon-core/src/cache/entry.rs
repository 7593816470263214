//! Cached query entries.

use super::cookie::{Cookie, WeakCookie};

/// A query result held by the query cache.
///
/// Owns a clone of its query, the identity-deduplicated result, and the
/// weakly-held cookies keeping it alive.
#[derive(Debug, Clone)]
pub struct CachedQuery<Q, C> {
    query: Q,
    pub(crate) result: C,
    cookies: Vec<WeakCookie>,
}

impl<Q, C> CachedQuery<Q, C> {
    pub(crate) fn new(query: Q, result: C) -> Self {
        Self {
            query,
            result,
            cookies: Vec::new(),
        }
    }

    /// The query this entry answers.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// The cached result.
    pub fn result(&self) -> &C {
        &self.result
    }

    /// Register a cookie. Registering the same cookie twice is a no-op.
    pub(crate) fn add_cookie(&mut self, cookie: &Cookie) {
        if !self.cookies.iter().any(|c| c.refers_to(cookie)) {
            self.cookies.push(cookie.downgrade());
        }
    }

    /// Unregister a cookie. Returns `false` if it was not registered.
    pub(crate) fn remove_cookie(&mut self, cookie: &Cookie) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|c| !c.refers_to(cookie));
        self.cookies.len() != before
    }

    /// Purge dead cookies, then report how many remain.
    pub(crate) fn cookies_count(&mut self) -> usize {
        self.cookies.retain(WeakCookie::is_alive);
        self.cookies.len()
    }
}
