//! Deterministic per-source aliasing (§4.1).
//!
//! Sources (tables, CTEs, subqueries) that don't carry an explicit alias are
//! assigned `t1`, `t2`, ... at render time. The counter is global to one
//! [`crate::context::Context`] and never resets when a scope is popped, so a
//! subquery can safely reference an alias assigned by an enclosing query
//! without collision.

use compact_str::{format_compact, CompactString};
use indexmap::IndexMap;

/// Identity of a FROM-able source. Assigned once per `Table`/`Cte`/`Select`
/// value at construction time (see [`crate::ast::entity::SourceHandle`]) so
/// that cloning a handle and referencing it twice in one query resolves to
/// the same alias.
pub type SourceId = u64;

#[derive(Debug, Default)]
pub struct AliasManager {
    counter: u64,
    scopes: Vec<IndexMap<SourceId, CompactString>>,
}

impl AliasManager {
    pub fn new() -> Self {
        Self {
            counter: 0,
            scopes: vec![IndexMap::new()],
        }
    }

    /// Opens a new alias scope (entered when rendering a subquery).
    pub fn push(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Returns the current scope depth, for `push_alias`/`pop_alias` in
    /// [`crate::context::Context`].
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Closes the innermost alias scope.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Truncates back to a previously observed depth (used to restore state
    /// after rendering a detour, e.g. a column-scope subquery).
    pub fn truncate_to(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Allocates a fresh alias for `source` in the current (innermost) scope.
    pub fn add(&mut self, source: SourceId) -> CompactString {
        self.counter += 1;
        let alias = format_compact!("t{}", self.counter);
        self.scopes
            .last_mut()
            .expect("alias manager always has a scope")
            .insert(source, alias.clone());
        alias
    }

    /// Looks up `source`'s alias, allocating one if it has never been seen.
    ///
    /// `any_depth = true` walks the scope stack top-to-bottom before
    /// allocating, so an outer source referenced from a subquery resolves to
    /// its existing alias rather than getting a redundant new one.
    pub fn get(&mut self, source: SourceId, any_depth: bool) -> CompactString {
        if any_depth {
            for scope in self.scopes.iter().rev() {
                if let Some(alias) = scope.get(&source) {
                    return alias.clone();
                }
            }
        } else if let Some(alias) = self.scopes.last().and_then(|s| s.get(&source)) {
            return alias.clone();
        }
        self.add(source)
    }

    /// Peeks an existing alias without allocating one.
    pub fn peek(&self, source: SourceId) -> Option<CompactString> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&source).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_monotonic_aliases() {
        let mut mgr = AliasManager::new();
        assert_eq!(mgr.get(1, true), "t1");
        assert_eq!(mgr.get(2, true), "t2");
        // Re-requesting the same source returns the same alias.
        assert_eq!(mgr.get(1, true), "t1");
    }

    #[test]
    fn subquery_sees_outer_alias_without_redundant_allocation() {
        let mut mgr = AliasManager::new();
        let outer = mgr.get(1, true);
        mgr.push();
        assert_eq!(mgr.get(1, true), outer);
        let inner_only = mgr.get(2, true);
        mgr.pop();
        // The counter never resets: next alias in the outer scope continues
        // from where the subquery left off.
        assert_eq!(mgr.get(3, true), "t3");
        assert_ne!(inner_only, "t3");
    }
}
