//! Vendor-specific rendering rules and feature flags (§4.5).
//!
//! A concrete [`Dialect`] lives in its own crate (`quarry-sqlite`,
//! `quarry-postgres`, `quarry-mysql`) so the core AST/renderer never has a
//! hard dependency on a specific vendor.

use compact_str::CompactString;

use crate::error::{QuarryError, Result};

/// One of the three supported wire dialects. Kept as a plain enum (rather
/// than only a trait object) because a handful of call sites — e.g. schema
/// introspection query selection — need to match on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    SQLite,
    PostgreSQL,
    MySQL,
}

/// Conflict-resolution action requested by `ON CONFLICT`/`INSERT OR ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Ignore,
    Replace,
    Update,
    Rollback,
    Abort,
    Fail,
}

/// An `OnConflict` clause attached to an insert (§4.4).
#[derive(Debug, Clone, Default)]
pub struct OnConflict {
    pub action: Option<ConflictAction>,
    /// Columns forming the conflict target (Postgres requires this for
    /// `DO UPDATE`; SQLite/MySQL ignore it).
    pub target: Vec<CompactString>,
    /// Named constraint as the conflict target, as an alternative to `target`.
    pub constraint: Option<CompactString>,
    /// `column -> new value` assignments for the update arm.
    pub update: Vec<(CompactString, crate::ast::Node)>,
    /// Columns to preserve from the excluded/incoming row verbatim.
    pub preserve: Vec<CompactString>,
    /// Extra filter applied to the `DO UPDATE` arm (Postgres only).
    pub where_clause: Option<Box<crate::ast::Node>>,
}

impl OnConflict {
    pub fn is_empty(&self) -> bool {
        self.action.is_none()
    }
}

/// The trailing conflict-resolution clause syntax a dialect uses when it
/// doesn't rewrite the statement prefix instead (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictClauseStyle {
    /// No trailing clause; conflict resolution is a statement-prefix
    /// rewrite ([`Dialect::conflict_statement`]) or unsupported.
    None,
    /// `ON CONFLICT (target) DO UPDATE SET ... [WHERE ...]` / `DO NOTHING`.
    Postgres,
    /// `ON DUPLICATE KEY UPDATE col = VALUES(col), ...`.
    MySql,
}

/// Feature flags and rendering hooks a dialect must supply.
///
/// Object-safe by design (`Dialect` is used behind `Rc<dyn Dialect>` in
/// [`crate::context::Context`]).
pub trait Dialect: core::fmt::Debug {
    fn kind(&self) -> DialectKind;

    /// Quote character for identifiers (`"` for SQLite/Postgres, `` ` ``
    /// for MySQL). Doubled to escape an embedded quote.
    fn quote_char(&self) -> char;

    /// Renders the Nth (1-based) parameter placeholder.
    fn param_marker(&self, index: usize) -> CompactString;

    /// Remaps a logical operator to its dialect-specific spelling, e.g.
    /// SQLite maps `LIKE` to `GLOB` and `ILIKE` to `LIKE`.
    fn remap_operator<'a>(&self, op: &'a str) -> &'a str {
        op
    }

    fn supports_for_update(&self) -> bool {
        true
    }

    fn supports_returning(&self) -> bool {
        false
    }

    /// `Some(n)` if a bare `OFFSET` requires a synthesized `LIMIT n` to be
    /// legal syntax (SQLite).
    fn limit_max(&self) -> Option<i64> {
        None
    }

    /// Whether compound-select arms (`UNION`, `INTERSECT`, ...) must each be
    /// individually parenthesized.
    fn compound_select_parens(&self) -> bool {
        false
    }

    fn commit_select(&self) -> bool {
        false
    }

    fn safe_create_index(&self) -> bool {
        true
    }

    fn safe_drop_index(&self) -> bool {
        true
    }

    fn supports_sequences(&self) -> bool {
        false
    }

    /// Rewrites `INSERT` into its conflict-handling statement form, when the
    /// dialect expresses conflict resolution as a statement prefix rather
    /// than a trailing clause (SQLite's `INSERT OR <ACTION>`, MySQL's
    /// `REPLACE`/`INSERT IGNORE`).
    fn conflict_statement(&self, _conflict: &OnConflict) -> Option<CompactString> {
        None
    }

    /// Whether this dialect renders conflict resolution as a trailing
    /// `ON CONFLICT .. DO UPDATE` / `ON DUPLICATE KEY UPDATE` clause.
    fn supports_conflict_update(&self) -> bool {
        false
    }

    /// Which trailing-clause syntax (if any) this dialect uses for
    /// conflict resolution that isn't expressed via [`Dialect::conflict_statement`]
    /// (§4.4, §6 conflict-resolution table).
    fn conflict_clause_style(&self) -> ConflictClauseStyle {
        ConflictClauseStyle::None
    }

    /// Validates an `OnConflict` clause against this dialect's rules,
    /// synchronously, before any SQL is generated (§7 builder-level misuse).
    fn validate_conflict(&self, conflict: &OnConflict) -> Result<()> {
        if conflict.is_empty() {
            return Ok(());
        }
        if !self.supports_conflict_update()
            && self.conflict_statement(conflict).is_none()
            && matches!(conflict.action, Some(ConflictAction::Update))
        {
            return Err(QuarryError::NotSupported(
                "this dialect does not support upsert".into(),
            ));
        }
        Ok(())
    }

    fn default_values_insert(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    /// `SELECT` text guaranteed to return zero rows, used by schema
    /// existence probes (`SELECT 0 WHERE 0`, Postgres `SELECT 0 WHERE false`).
    fn noop_select(&self) -> &'static str {
        "SELECT 0 WHERE 0"
    }

    /// Maps a semantic field type name to this dialect's DDL column type.
    fn field_type(&self, semantic: &str) -> CompactString;

    fn extract_date_sql(&self, part: &str, source: &crate::ast::Node) -> crate::ast::Node;
    fn truncate_date_sql(&self, part: &str, source: &crate::ast::Node) -> crate::ast::Node;

    /// Introspection query text for the given kind (`"tables"`, `"columns"`,
    /// `"indexes"`, `"foreign_keys"`, `"primary_keys"`, `"sequences"`).
    fn introspection_query(&self, kind: &str) -> Option<&'static str>;
}

/// Schema introspection result records (§6, stable across dialects).
#[derive(Debug, Clone)]
pub struct IndexMetadata {
    pub name: CompactString,
    pub sql: Option<CompactString>,
    pub columns: Vec<CompactString>,
    pub unique: bool,
    pub table: CompactString,
}

#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    pub name: CompactString,
    pub data_type: CompactString,
    pub null: bool,
    pub primary_key: bool,
    pub table: CompactString,
}

#[derive(Debug, Clone)]
pub struct ForeignKeyMetadata {
    pub column: CompactString,
    pub dest_table: CompactString,
    pub dest_column: CompactString,
    pub table: CompactString,
}
