//! SQLite dialect: rendering rules, feature flags, conflict resolution and
//! introspection query text (§4.5, §4.9, §6).

use compact_str::CompactString;

use quarry_core::ast::{Cast, Function, Node};
use quarry_core::dialect::{Dialect, DialectKind, OnConflict};
use quarry_core::error::{QuarryError, Result};

/// `year`/`month`/`day`/`hour`/`minute`/`second` -> `strftime` format, used
/// for both extraction (cast to INTEGER) and truncation (kept as text).
fn strftime_format(part: &str) -> Result<&'static str> {
    match part {
        "year" => Ok("%Y"),
        "month" => Ok("%m"),
        "day" => Ok("%d"),
        "hour" => Ok("%H"),
        "minute" => Ok("%M"),
        "second" => Ok("%S"),
        other => Err(QuarryError::NotSupported(format!("unsupported date part `{other}`").into())),
    }
}

/// SQLite has no native `DATE_TRUNC`; this mirrors each part's own
/// `strftime` truncation format (wider precision than extraction's since
/// truncating to "day" must keep year and month too).
fn strftime_trunc_format(part: &str) -> Result<&'static str> {
    match part {
        "year" => Ok("%Y"),
        "month" => Ok("%Y-%m"),
        "day" => Ok("%Y-%m-%d"),
        "hour" => Ok("%Y-%m-%d %H"),
        "minute" => Ok("%Y-%m-%d %H:%M"),
        "second" => Ok("%Y-%m-%d %H:%M:%S"),
        other => Err(QuarryError::NotSupported(format!("unsupported date part `{other}`").into())),
    }
}

#[derive(Debug, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        SqliteDialect
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::SQLite
    }

    fn quote_char(&self) -> char {
        '"'
    }

    fn param_marker(&self, _index: usize) -> CompactString {
        "?".into()
    }

    fn remap_operator<'a>(&self, op: &'a str) -> &'a str {
        match op {
            "LIKE" => "GLOB",
            "ILIKE" => "LIKE",
            other => other,
        }
    }

    /// A bare `OFFSET` needs a syntactically-legal `LIMIT` in front of it;
    /// SQLite's own sentinel for "no limit" is `-1`.
    fn limit_max(&self) -> Option<i64> {
        Some(-1)
    }

    /// No DO-UPDATE upsert here — only the `INSERT OR <ACTION>` rewrite
    /// below; see [`Dialect::validate_conflict`].
    fn conflict_statement(&self, conflict: &OnConflict) -> Option<CompactString> {
        use quarry_core::dialect::ConflictAction;
        conflict.action.map(|action| match action {
            ConflictAction::Ignore => "INSERT OR IGNORE".into(),
            ConflictAction::Replace => "INSERT OR REPLACE".into(),
            ConflictAction::Rollback => "INSERT OR ROLLBACK".into(),
            ConflictAction::Abort => "INSERT OR ABORT".into(),
            ConflictAction::Fail => "INSERT OR FAIL".into(),
            ConflictAction::Update => "INSERT OR REPLACE".into(),
        })
    }

    fn validate_conflict(&self, conflict: &OnConflict) -> Result<()> {
        if conflict.is_empty() {
            return Ok(());
        }
        if !conflict.update.is_empty()
            || !conflict.preserve.is_empty()
            || !conflict.target.is_empty()
            || conflict.constraint.is_some()
            || conflict.where_clause.is_some()
        {
            return Err(QuarryError::NotSupported(
                "SQLite conflict resolution only supports an action (IGNORE/REPLACE/ROLLBACK/ABORT/FAIL); update/preserve/where/target are not supported".into(),
            ));
        }
        Ok(())
    }

    fn field_type(&self, semantic: &str) -> CompactString {
        match semantic {
            "auto" => "INTEGER",
            "integer" | "biginteger" => "INTEGER",
            "float" | "double" => "REAL",
            "decimal" => "DECIMAL",
            "char" => "VARCHAR",
            "fixedchar" => "CHAR",
            "text" | "uuid" => "TEXT",
            "blob" => "BLOB",
            "bool" => "INTEGER",
            "date" => "DATE",
            "datetime" | "timestamp" => "DATETIME",
            "time" => "TIME",
            "ip" => "INTEGER",
            _ => "",
        }
        .into()
    }

    fn extract_date_sql(&self, part: &str, source: &Node) -> Node {
        let Ok(format) = strftime_format(part) else {
            return source.clone();
        };
        Node::Cast(Box::new(Cast::new(
            Node::Function(Function::new("strftime", vec![Node::value(format), source.clone()])),
            "INTEGER",
        )))
    }

    fn truncate_date_sql(&self, part: &str, source: &Node) -> Node {
        let Ok(format) = strftime_trunc_format(part) else {
            return source.clone();
        };
        Node::Function(Function::new("strftime", vec![Node::value(format), source.clone()]))
    }

    fn introspection_query(&self, kind: &str) -> Option<&'static str> {
        match kind {
            "tables" => Some("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name"),
            "indexes" => Some("SELECT name, sql FROM sqlite_master WHERE type = 'index' AND tbl_name = ? ORDER BY name"),
            "columns" => Some("PRAGMA table_info(?)"),
            "foreign_keys" => Some("PRAGMA foreign_key_list(?)"),
            "primary_keys" => Some("PRAGMA table_info(?)"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::dialect::ConflictAction;

    #[test]
    fn like_remaps_to_glob_and_ilike_remaps_to_like() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.remap_operator("LIKE"), "GLOB");
        assert_eq!(dialect.remap_operator("ILIKE"), "LIKE");
    }

    #[test]
    fn conflict_statement_renders_insert_or_action() {
        let dialect = SqliteDialect::new();
        let conflict = OnConflict { action: Some(ConflictAction::Ignore), ..Default::default() };
        assert_eq!(dialect.conflict_statement(&conflict).unwrap().as_str(), "INSERT OR IGNORE");
    }

    #[test]
    fn conflict_with_update_map_is_rejected() {
        let dialect = SqliteDialect::new();
        let conflict = OnConflict {
            action: Some(ConflictAction::Update),
            update: vec![("name".into(), Node::value("x"))],
            ..Default::default()
        };
        assert!(dialect.validate_conflict(&conflict).is_err());
    }

    #[test]
    fn extract_date_sql_casts_strftime_to_integer() {
        let dialect = SqliteDialect::new();
        let node = dialect.extract_date_sql("year", &Node::raw("created_at"));
        assert!(matches!(node, Node::Cast(_)));
    }
}
