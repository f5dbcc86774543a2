//! MySQL dialect: rendering rules, feature flags, upsert and introspection
//! query text (§4.5, §4.9, §6).

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

/// `DATE_FORMAT` format string per part; mirrors SQLite's `strftime` table
/// except minute/second use MySQL's `%i`/`%s` specifiers.
fn date_format(part: &str) -> Result<&'static str> {
    match part {
        "year" => Ok("%Y"),
        "month" => Ok("%Y-%m"),
        "day" => Ok("%Y-%m-%d"),
        "hour" => Ok("%Y-%m-%d %H"),
        "minute" => Ok("%Y-%m-%d %H:%i"),
        "second" => Ok("%Y-%m-%d %H:%i:%S"),
        other => Err(QuarryError::NotSupported(format!("unsupported date part `{other}`").into())),
    }
}

#[derive(Debug, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        MysqlDialect
    }
}

impl Dialect for MysqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySQL
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn param_marker(&self, _index: usize) -> CompactString {
        "%s".into()
    }

    fn remap_operator<'a>(&self, op: &'a str) -> &'a str {
        match op {
            "LIKE" => "LIKE BINARY",
            "ILIKE" => "LIKE",
            other => other,
        }
    }

    fn supports_for_update(&self) -> bool {
        true
    }

    fn commit_select(&self) -> bool {
        true
    }

    /// `u64::MAX` would overflow `i64`; MySQL's own sentinel is `2**64-1`
    /// but `LIMIT 18446744073709551615` does not fit a signed bind
    /// parameter, so `i64::MAX` is used as the practically-unreachable cap.
    fn limit_max(&self) -> Option<i64> {
        Some(i64::MAX)
    }

    fn safe_create_index(&self) -> bool {
        false
    }

    fn safe_drop_index(&self) -> bool {
        false
    }

    fn conflict_statement(&self, conflict: &OnConflict) -> Option<CompactString> {
        match conflict.action {
            Some(ConflictAction::Replace) => Some("REPLACE".into()),
            Some(ConflictAction::Ignore) => Some("INSERT IGNORE".into()),
            _ => None,
        }
    }

    fn supports_conflict_update(&self) -> bool {
        true
    }

    fn conflict_clause_style(&self) -> ConflictClauseStyle {
        ConflictClauseStyle::MySql
    }

    fn validate_conflict(&self, conflict: &OnConflict) -> Result<()> {
        if conflict.is_empty() {
            return Ok(());
        }
        if conflict.where_clause.is_some() || !conflict.target.is_empty() || conflict.constraint.is_some() {
            return Err(QuarryError::NotSupported(
                "MySQL does not support a WHERE clause or conflict target for conflict resolution".into(),
            ));
        }
        match conflict.action {
            Some(ConflictAction::Replace) | Some(ConflictAction::Ignore) | Some(ConflictAction::Update) => Ok(()),
            Some(_) => Err(QuarryError::NotSupported(
                "MySQL conflict resolution only supports replace, ignore and update".into(),
            )),
            None => Ok(()),
        }
    }

    fn default_values_insert(&self) -> &'static str {
        "() VALUES ()"
    }

    fn field_type(&self, semantic: &str) -> CompactString {
        match semantic {
            "auto" => "INTEGER AUTO_INCREMENT",
            "integer" => "INTEGER",
            "biginteger" => "BIGINT",
            "float" => "FLOAT",
            "double" => "DOUBLE PRECISION",
            "decimal" => "NUMERIC",
            "char" => "VARCHAR",
            "fixedchar" => "CHAR",
            "text" => "TEXT",
            "blob" => "BLOB",
            "bool" => "BOOL",
            "uuid" => "VARCHAR(40)",
            "date" => "DATE",
            "datetime" | "timestamp" => "DATETIME",
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
        let Ok(format) = date_format(part) else {
            return source.clone();
        };
        Node::Function(Function::new("DATE_FORMAT", vec![source.clone(), Node::value(format)]))
    }

    fn noop_select(&self) -> &'static str {
        "DO 0"
    }

    fn introspection_query(&self, kind: &str) -> Option<&'static str> {
        match kind {
            "tables" => Some("SHOW TABLES"),
            "indexes" => Some("SHOW INDEX FROM %s"),
            "columns" => Some(
                "SELECT column_name, is_nullable, data_type FROM information_schema.columns \
                 WHERE table_name = %s AND table_schema = DATABASE()",
            ),
            "primary_keys" => Some("SHOW INDEX FROM %s"),
            "foreign_keys" => Some(
                "SELECT column_name, referenced_table_name, referenced_column_name \
                 FROM information_schema.key_column_usage \
                 WHERE table_name = %s AND table_schema = DATABASE() \
                 AND referenced_table_name IS NOT NULL AND referenced_column_name IS NOT NULL",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_remaps_to_like_binary() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.remap_operator("LIKE"), "LIKE BINARY");
    }

    #[test]
    fn conflict_statement_handles_replace_and_ignore() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.conflict_statement(&OnConflict { action: Some(ConflictAction::Replace), ..Default::default() }).unwrap().as_str(),
            "REPLACE"
        );
        assert_eq!(
            dialect.conflict_statement(&OnConflict { action: Some(ConflictAction::Ignore), ..Default::default() }).unwrap().as_str(),
            "INSERT IGNORE"
        );
    }

    #[test]
    fn conflict_with_a_target_is_rejected() {
        let dialect = MysqlDialect::new();
        let conflict = OnConflict {
            action: Some(ConflictAction::Update),
            target: vec!["id".into()],
            update: vec![("name".into(), Node::value("x"))],
            ..Default::default()
        };
        assert!(dialect.validate_conflict(&conflict).is_err());
    }
}
