//! PostgreSQL dialect: rendering rules, feature flags, upsert and
//! introspection query text (§4.5, §4.9, §6).

use std::cell::Cell;

use compact_str::CompactString;

use quarry_core::ast::{Function, Node, NodeList};
use quarry_core::dialect::{ConflictAction, ConflictClauseStyle, Dialect, DialectKind, OnConflict};
use quarry_core::error::{QuarryError, Result};

fn extract_part(part: &str) -> Result<&'static str> {
    match part {
        "year" => Ok("YEAR"),
        "month" => Ok("MONTH"),
        "day" => Ok("DAY"),
        "hour" => Ok("HOUR"),
        "minute" => Ok("MINUTE"),
        "second" => Ok("SECOND"),
        other => Err(QuarryError::NotSupported(format!("unsupported date part `{other}`").into())),
    }
}

/// `Dialect` is `core::fmt::Debug` only (no `&mut self` anywhere) so the
/// server-version-gated `safe_create_index` toggle (§9 Open Question:
/// "Postgres ≥ 9.6 makes `CREATE INDEX CONCURRENTLY` safe by default") has
/// to live behind interior mutability rather than a plain bool field.
#[derive(Debug)]
pub struct PostgresDialect {
    safe_create_index: Cell<bool>,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        PostgresDialect { safe_create_index: Cell::new(false) }
    }
}

impl PostgresDialect {
    pub fn new() -> Self {
        PostgresDialect::default()
    }

    /// Best-effort advisory (§9): flips `safe_create_index` once a caller
    /// learns the connected server's version is 9.6+. Not synchronized
    /// across threads sharing this dialect instance, matching the
    /// original's own unsynchronized `set_server_version`.
    pub fn set_server_version(&self, version: u32) {
        if version >= 90600 {
            self.safe_create_index.set(true);
        }
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::PostgreSQL
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn param_marker(&self, _index: usize) -> CompactString {
        "%s".into()
    }

    fn remap_operator<'a>(&self, op: &'a str) -> &'a str {
        match op {
            "REGEXP" => "~",
            other => other,
        }
    }

    fn supports_for_update(&self) -> bool {
        true
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn compound_select_parens(&self) -> bool {
        true
    }

    fn commit_select(&self) -> bool {
        true
    }

    fn safe_create_index(&self) -> bool {
        self.safe_create_index.get()
    }

    fn supports_sequences(&self) -> bool {
        true
    }

    fn supports_conflict_update(&self) -> bool {
        true
    }

    fn conflict_clause_style(&self) -> ConflictClauseStyle {
        ConflictClauseStyle::Postgres
    }

    fn validate_conflict(&self, conflict: &OnConflict) -> Result<()> {
        if conflict.is_empty() {
            return Ok(());
        }
        match conflict.action {
            Some(ConflictAction::Ignore) => Ok(()),
            Some(ConflictAction::Update) => {
                if conflict.update.is_empty() && conflict.preserve.is_empty() {
                    return Err(QuarryError::Builder(
                        "an upsert with no update/preserve columns should use the ignore action instead".into(),
                    ));
                }
                if conflict.target.is_empty() && conflict.constraint.is_none() {
                    return Err(QuarryError::Builder(
                        "Postgres requires a conflict target (columns or a named constraint) for an upsert".into(),
                    ));
                }
                Ok(())
            }
            Some(_) => Err(QuarryError::NotSupported(
                "Postgres conflict resolution only supports the ignore and update actions".into(),
            )),
            None => Ok(()),
        }
    }

    fn field_type(&self, semantic: &str) -> CompactString {
        match semantic {
            "auto" => "SERIAL",
            "integer" => "INTEGER",
            "biginteger" => "BIGINT",
            "float" => "REAL",
            "double" => "DOUBLE PRECISION",
            "decimal" => "NUMERIC",
            "char" => "VARCHAR",
            "fixedchar" => "CHAR",
            "text" => "TEXT",
            "blob" => "BYTEA",
            "bool" => "BOOLEAN",
            "uuid" => "UUID",
            "date" => "DATE",
            "datetime" | "timestamp" => "TIMESTAMP",
            "time" => "TIME",
            "ip" => "BIGINT",
            _ => "",
        }
        .into()
    }

    fn extract_date_sql(&self, part: &str, source: &Node) -> Node {
        let Ok(keyword) = extract_part(part) else {
            return source.clone();
        };
        Node::Function(Function::new(
            "EXTRACT",
            vec![Node::NodeList(NodeList::space(vec![Node::raw(keyword), Node::raw("FROM"), source.clone()]))],
        ))
    }

    fn truncate_date_sql(&self, part: &str, source: &Node) -> Node {
        Node::Function(Function::new("DATE_TRUNC", vec![Node::value(part.to_owned()), source.clone()]))
    }

    fn noop_select(&self) -> &'static str {
        "SELECT 0 WHERE false"
    }

    fn introspection_query(&self, kind: &str) -> Option<&'static str> {
        match kind {
            "tables" => Some("SELECT tablename FROM pg_catalog.pg_tables WHERE schemaname = %s ORDER BY tablename"),
            "indexes" => Some(
                "SELECT i.relname, idxs.indexdef, idx.indisunique, array_to_string(array_agg(cols.attname), ',') \
                 FROM pg_catalog.pg_class AS t \
                 INNER JOIN pg_catalog.pg_index AS idx ON t.oid = idx.indrelid \
                 INNER JOIN pg_catalog.pg_class AS i ON idx.indexrelid = i.oid \
                 INNER JOIN pg_catalog.pg_indexes AS idxs ON (idxs.tablename = t.relname AND idxs.indexname = i.relname) \
                 LEFT OUTER JOIN pg_catalog.pg_attribute AS cols ON (cols.attrelid = t.oid AND cols.attnum = ANY(idx.indkey)) \
                 WHERE t.relname = %s AND t.relkind = 'r' AND idxs.schemaname = %s \
                 GROUP BY i.relname, idxs.indexdef, idx.indisunique \
                 ORDER BY idx.indisunique DESC, i.relname",
            ),
            "columns" => Some(
                "SELECT column_name, is_nullable, data_type FROM information_schema.columns \
                 WHERE table_name = %s AND table_schema = %s ORDER BY ordinal_position",
            ),
            "primary_keys" => Some(
                "SELECT kc.column_name FROM information_schema.table_constraints AS tc \
                 INNER JOIN information_schema.key_column_usage AS kc \
                 ON (tc.table_name = kc.table_name AND tc.table_schema = kc.table_schema AND tc.constraint_name = kc.constraint_name) \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_name = %s AND tc.table_schema = %s",
            ),
            "foreign_keys" => Some(
                "SELECT kcu.column_name, ccu.table_name, ccu.column_name FROM information_schema.table_constraints AS tc \
                 JOIN information_schema.key_column_usage AS kcu \
                 ON (tc.constraint_name = kcu.constraint_name AND tc.constraint_schema = kcu.constraint_schema) \
                 JOIN information_schema.constraint_column_usage AS ccu \
                 ON (ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.constraint_schema) \
                 WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_name = %s AND tc.table_schema = %s",
            ),
            "sequences" => Some(
                "SELECT COUNT(*) FROM pg_class, pg_namespace \
                 WHERE relkind = 'S' AND pg_class.relnamespace = pg_namespace.oid AND relname = %s",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_version_below_96_leaves_unsafe_index_creation() {
        let dialect = PostgresDialect::new();
        assert!(!dialect.safe_create_index());
        dialect.set_server_version(90500);
        assert!(!dialect.safe_create_index());
    }

    #[test]
    fn server_version_96_or_above_enables_safe_index_creation() {
        let dialect = PostgresDialect::new();
        dialect.set_server_version(90600);
        assert!(dialect.safe_create_index());
    }

    #[test]
    fn upsert_without_a_target_is_rejected() {
        let dialect = PostgresDialect::new();
        let conflict = OnConflict {
            action: Some(ConflictAction::Update),
            update: vec![("name".into(), Node::value("x"))],
            ..Default::default()
        };
        assert!(dialect.validate_conflict(&conflict).is_err());
    }

    #[test]
    fn upsert_with_a_target_passes_validation() {
        let dialect = PostgresDialect::new();
        let conflict = OnConflict {
            action: Some(ConflictAction::Update),
            target: vec!["id".into()],
            update: vec![("name".into(), Node::value("x"))],
            ..Default::default()
        };
        assert!(dialect.validate_conflict(&conflict).is_ok());
    }
}
