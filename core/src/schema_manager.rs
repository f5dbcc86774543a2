//! DDL generation and topological create/drop ordering (§4.9).
//!
//! DDL isn't expressed through the [`crate::ast`]/[`crate::context`]
//! machinery — there's no `Node` variant for a column or constraint clause
//! — so this module builds statement text directly off dialect quoting and
//! type-mapping hooks, the same way a schema manager assembles `CREATE
//! TABLE` from field DDL fragments.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use compact_str::CompactString;

use crate::dialect::Dialect;
use crate::driver::Connection;
use crate::error::{QuarryError, Result};
use crate::model::{Field, ModelIndex, PrimaryKey, ReferentialAction, SharedMeta};

fn quote(dialect: &dyn Dialect, name: &str) -> String {
    let q = dialect.quote_char();
    let escaped = name.replace(q, &format!("{q}{q}"));
    format!("{q}{escaped}{q}")
}

/// `<table>_<col1>_<col2>_…`, non-word characters stripped, truncated to 64
/// bytes with a 7-character MD5 suffix when over (§4.9).
fn derive_index_name(table: &str, columns: &[CompactString]) -> CompactString {
    let raw = format!("{table}_{}", columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join("_"));
    let cleaned: String = raw.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    if cleaned.len() <= 64 {
        return cleaned.into();
    }
    let digest = format!("{:x}", md5::compute(cleaned.as_bytes()));
    format!("{}_{}", &cleaned[..56], &digest[..7]).into()
}

fn column_ddl(dialect: &dyn Dialect, field: &Rc<dyn Field>, is_only_pk: bool) -> String {
    let mut sql = format!("{} {}", quote(dialect, field.column_name()), dialect.field_type(field.semantic_type()));
    if is_only_pk {
        sql.push_str(" PRIMARY KEY");
    }
    if !field.null() && !is_only_pk {
        sql.push_str(" NOT NULL");
    }
    if field.unique() && !is_only_pk {
        sql.push_str(" UNIQUE");
    }
    if dialect.supports_sequences() {
        if let Some(seq) = field.sequence() {
            sql.push_str(&format!(" DEFAULT NEXTVAL('{seq}')"));
        }
    }
    sql
}

fn create_sequence_sql(dialect: &dyn Dialect, sequence: &str) -> String {
    format!("CREATE SEQUENCE {}", quote(dialect, sequence))
}

fn drop_sequence_sql(dialect: &dyn Dialect, sequence: &str) -> String {
    format!("DROP SEQUENCE {}", quote(dialect, sequence))
}

fn referential_action_sql(action: ReferentialAction) -> &'static str {
    match action {
        ReferentialAction::Cascade => "CASCADE",
        ReferentialAction::SetNull => "SET NULL",
        ReferentialAction::SetDefault => "SET DEFAULT",
        ReferentialAction::Restrict => "RESTRICT",
        ReferentialAction::NoAction => "NO ACTION",
    }
}

fn foreign_key_constraint_sql(dialect: &dyn Dialect, field: &Rc<dyn Field>, target: &SharedMeta) -> Result<String> {
    let target_meta = target.borrow();
    let target_column = match field.to_field() {
        Some(name) => target_meta
            .field(name)
            .ok_or_else(|| QuarryError::ImproperlyConfigured(format!("`{}` has no field named `{name}`", target_meta.name).into()))?
            .column_name()
            .clone(),
        None => {
            let pk_names = target_meta.primary_key_field_names();
            let pk_name = pk_names.first().ok_or_else(|| {
                QuarryError::ImproperlyConfigured(format!("`{}` has no primary key to reference", target_meta.name).into())
            })?;
            target_meta
                .field(pk_name)
                .ok_or_else(|| QuarryError::Internal("primary key field missing from metadata".into()))?
                .column_name()
                .clone()
        }
    };
    let mut sql = format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        quote(dialect, field.column_name()),
        quote(dialect, &target_meta.table_name),
        quote(dialect, &target_column),
    );
    if let Some(action) = field.on_delete() {
        sql.push_str(&format!(" ON DELETE {}", referential_action_sql(action)));
    }
    if let Some(action) = field.on_update() {
        sql.push_str(&format!(" ON UPDATE {}", referential_action_sql(action)));
    }
    Ok(sql)
}

/// Per-model DDL for one [`SharedMeta`] (§4.9).
pub struct SchemaManager<'a> {
    meta: &'a SharedMeta,
}

impl<'a> SchemaManager<'a> {
    pub fn new(meta: &'a SharedMeta) -> Self {
        SchemaManager { meta }
    }

    pub fn create_table_sql(&self, dialect: &dyn Dialect, safe: bool, temporary: bool) -> Result<String> {
        let meta = self.meta.borrow();
        let prefix = if temporary { "CREATE TEMPORARY TABLE " } else { "CREATE TABLE " };
        let mut sql = String::from(prefix);
        if safe {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&quote(dialect, &meta.table_name));
        sql.push_str(" (\n");

        let sorted: Vec<Rc<dyn Field>> = meta.sorted_fields().into_iter().cloned().collect();
        let single_pk_name = match &meta.primary_key {
            PrimaryKey::Single(name) => Some(name.clone()),
            _ => None,
        };

        let mut lines: Vec<String> = Vec::new();
        for field in &sorted {
            let is_only_pk = single_pk_name.as_deref() == Some(field.name().as_str());
            lines.push(format!("  {}", column_ddl(dialect, field, is_only_pk)));
        }

        if let PrimaryKey::Composite(names) = &meta.primary_key {
            let cols: Vec<String> = names
                .iter()
                .map(|n| meta.field(n).map(|f| quote(dialect, f.column_name())).unwrap_or_else(|| quote(dialect, n)))
                .collect();
            lines.push(format!("  PRIMARY KEY ({})", cols.join(", ")));
        }

        for (field_name, target_name) in &meta.refs {
            let Some(field) = meta.field(field_name) else { continue };
            let Some(target) = crate::model::lookup(target_name) else { continue };
            lines.push(format!("  {}", foreign_key_constraint_sql(dialect, field, &target)?));
        }

        for constraint in &meta.constraints {
            lines.push(format!("  {constraint}"));
        }

        sql.push_str(&lines.join(",\n"));
        sql.push_str("\n)");
        if meta.without_rowid {
            sql.push_str(" WITHOUT ROWID");
        }
        Ok(sql)
    }

    pub fn drop_table_sql(&self, dialect: &dyn Dialect, safe: bool, temporary: bool) -> String {
        let meta = self.meta.borrow();
        let mut sql = String::from(if temporary { "DROP TEMPORARY TABLE " } else { "DROP TABLE " });
        if safe {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&quote(dialect, &meta.table_name));
        sql
    }

    /// Explicit [`ModelIndex`] entries plus implicit single-column indexes
    /// from `index`/`unique` field flags (the primary key never gets one —
    /// it's already indexed by the column DDL itself).
    fn indexes(&self) -> Vec<ModelIndex> {
        let meta = self.meta.borrow();
        let mut indexes = meta.indexes.clone();
        for field in meta.sorted_fields() {
            if field.primary_key() {
                continue;
            }
            if field.unique() || field.index() {
                indexes.push(ModelIndex {
                    columns: vec![field.column_name().clone()],
                    unique: field.unique(),
                });
            }
        }
        indexes
    }

    pub fn create_indexes_sql(&self, dialect: &dyn Dialect, safe: bool) -> Vec<String> {
        let meta = self.meta.borrow();
        self.indexes()
            .iter()
            .map(|index| {
                let name = derive_index_name(&meta.table_name, &index.columns);
                let unique = if index.unique { "UNIQUE " } else { "" };
                let cols = index.columns.iter().map(|c| quote(dialect, c)).collect::<Vec<_>>().join(", ");
                let mut sql = format!("CREATE {unique}INDEX ");
                if safe && dialect.safe_create_index() {
                    sql.push_str("IF NOT EXISTS ");
                }
                sql.push_str(&format!("{} ON {} ({cols})", quote(dialect, &name), quote(dialect, &meta.table_name)));
                sql
            })
            .collect()
    }

    /// Fields with an explicit sequence name, in declaration order (§4.9).
    fn sequenced_fields(&self) -> Vec<Rc<dyn Field>> {
        let meta = self.meta.borrow();
        meta.sorted_fields()
            .into_iter()
            .filter(|f| f.sequence().is_some())
            .cloned()
            .collect()
    }

    /// `CREATE SEQUENCE` for every field with a `sequence` name, when the
    /// dialect supports sequences; empty otherwise (§4.9).
    pub fn create_sequences_sql(&self, dialect: &dyn Dialect) -> Vec<String> {
        if !dialect.supports_sequences() {
            return Vec::new();
        }
        self.sequenced_fields()
            .iter()
            .map(|f| create_sequence_sql(dialect, f.sequence().expect("filtered by sequenced_fields")))
            .collect()
    }

    /// `DROP SEQUENCE` counterpart to [`SchemaManager::create_sequences_sql`].
    pub fn drop_sequences_sql(&self, dialect: &dyn Dialect) -> Vec<String> {
        if !dialect.supports_sequences() {
            return Vec::new();
        }
        self.sequenced_fields()
            .iter()
            .map(|f| drop_sequence_sql(dialect, f.sequence().expect("filtered by sequenced_fields")))
            .collect()
    }

    pub fn drop_indexes_sql(&self, dialect: &dyn Dialect, safe: bool) -> Vec<String> {
        let meta = self.meta.borrow();
        self.indexes()
            .iter()
            .map(|index| {
                let name = derive_index_name(&meta.table_name, &index.columns);
                let mut sql = String::from("DROP INDEX ");
                if safe && dialect.safe_drop_index() {
                    sql.push_str("IF EXISTS ");
                }
                sql.push_str(&quote(dialect, &name));
                sql
            })
            .collect()
    }
}

/// Topologically sorts `models` by `refs ∪ depends_on` so a referenced model
/// is always created before the model that references it (§4.9). Cycles
/// (mutual/self FKs) are broken by simply not revisiting an already-queued
/// model, same as the model registry's cascade-delete seen-set.
fn topological_order(models: &[SharedMeta]) -> Vec<SharedMeta> {
    let index_of: HashMap<CompactString, usize> = models
        .iter()
        .enumerate()
        .map(|(i, m)| (CompactString::from(m.borrow().name.to_lowercase()), i))
        .collect();

    let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); models.len()];
    for (i, model) in models.iter().enumerate() {
        let meta = model.borrow();
        let names = meta.refs.values().cloned().chain(meta.depends_on.iter().cloned());
        for name in names {
            if let Some(&j) = index_of.get(&CompactString::from(name.to_lowercase())) {
                if j != i {
                    deps[i].insert(j);
                }
            }
        }
    }

    let mut visited = vec![false; models.len()];
    let mut order = Vec::with_capacity(models.len());
    fn visit(i: usize, deps: &[HashSet<usize>], visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[i] {
            return;
        }
        visited[i] = true;
        for &dep in &deps[i] {
            visit(dep, deps, visited, order);
        }
        order.push(i);
    }
    for i in 0..models.len() {
        visit(i, &deps, &mut visited, &mut order);
    }
    order.into_iter().map(|i| models[i].clone()).collect()
}

/// Creates every table in `models` (parent-before-child, §4.9's topological
/// ordering), then every index.
pub fn create_tables(conn: &mut dyn Connection, dialect: &dyn Dialect, models: &[SharedMeta], safe: bool) -> Result<()> {
    let ordered = topological_order(models);
    for model in &ordered {
        let manager = SchemaManager::new(model);
        for sql in manager.create_sequences_sql(dialect) {
            conn.execute(&sql, &[])?;
        }
        let sql = manager.create_table_sql(dialect, safe, false)?;
        conn.execute(&sql, &[])?;
    }
    for model in &ordered {
        for sql in SchemaManager::new(model).create_indexes_sql(dialect, safe) {
            conn.execute(&sql, &[])?;
        }
    }
    Ok(())
}

/// Drops every table in `models` in reverse topological order (children
/// before the parents they reference, §4.9).
pub fn drop_tables(conn: &mut dyn Connection, dialect: &dyn Dialect, models: &[SharedMeta], safe: bool) -> Result<()> {
    let mut ordered = topological_order(models);
    ordered.reverse();
    for model in &ordered {
        let manager = SchemaManager::new(model);
        let sql = manager.drop_table_sql(dialect, safe, false);
        conn.execute(&sql, &[])?;
        for sql in manager.drop_sequences_sql(dialect) {
            conn.execute(&sql, &[])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;
    use crate::dialect::DialectKind;
    use crate::driver::test_support::MockConnection;
    use crate::model::field::{FieldKind, ForeignKeyField, ScalarField};
    use crate::model::meta::ModelMeta;
    use crate::model::registry;

    #[derive(Debug)]
    struct TestDialect;
    impl Dialect for TestDialect {
        fn kind(&self) -> DialectKind {
            DialectKind::SQLite
        }
        fn quote_char(&self) -> char {
            '"'
        }
        fn param_marker(&self, _index: usize) -> CompactString {
            "?".into()
        }
        fn field_type(&self, semantic: &str) -> CompactString {
            match semantic {
                "auto" | "integer" => "INTEGER".into(),
                "text" => "TEXT".into(),
                other => other.to_uppercase().into(),
            }
        }
        fn extract_date_sql(&self, _part: &str, source: &Node) -> Node {
            source.clone()
        }
        fn truncate_date_sql(&self, _part: &str, source: &Node) -> Node {
            source.clone()
        }
        fn introspection_query(&self, _kind: &str) -> Option<&'static str> {
            None
        }
    }

    #[derive(Debug)]
    struct SequenceDialect;
    impl Dialect for SequenceDialect {
        fn kind(&self) -> DialectKind {
            DialectKind::PostgreSQL
        }
        fn quote_char(&self) -> char {
            '"'
        }
        fn param_marker(&self, index: usize) -> CompactString {
            format!("${index}").into()
        }
        fn field_type(&self, semantic: &str) -> CompactString {
            match semantic {
                "auto" | "integer" => "INTEGER".into(),
                "text" => "TEXT".into(),
                other => other.to_uppercase().into(),
            }
        }
        fn extract_date_sql(&self, _part: &str, source: &Node) -> Node {
            source.clone()
        }
        fn truncate_date_sql(&self, _part: &str, source: &Node) -> Node {
            source.clone()
        }
        fn introspection_query(&self, _kind: &str) -> Option<&'static str> {
            None
        }
        fn supports_sequences(&self) -> bool {
            true
        }
    }

    fn user_and_book() -> (SharedMeta, SharedMeta) {
        let n = crate::model::field::next_declaration_order();
        let user = ModelMeta::builder(format!("SchemaUser{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("name", FieldKind::Text).unique()))
            .unwrap()
            .build();
        let user_shared = registry::register_model(user);

        let fk = Rc::new(ForeignKeyField::new("author", user_shared.borrow().name.clone()).on_delete(ReferentialAction::Cascade));
        let book = ModelMeta::builder(format!("SchemaBook{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("title", FieldKind::Text)))
            .unwrap()
            .foreign_key(fk)
            .unwrap()
            .build();
        let book_shared = registry::register_model(book);
        (user_shared, book_shared)
    }

    #[test]
    fn create_table_emits_primary_key_and_unique_column() {
        let (user, _book) = user_and_book();
        let sql = SchemaManager::new(&user).create_table_sql(&TestDialect, true, false).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS"));
        assert!(sql.contains(r#""id" INTEGER PRIMARY KEY"#));
        assert!(sql.contains(r#""name" TEXT NOT NULL UNIQUE"#));
    }

    #[test]
    fn create_table_emits_inline_foreign_key_with_on_delete() {
        let (_user, book) = user_and_book();
        let sql = SchemaManager::new(&book).create_table_sql(&TestDialect, true, false).unwrap();
        assert!(sql.contains("FOREIGN KEY (\"author\") REFERENCES"));
        assert!(sql.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn index_name_over_64_chars_gets_truncated_with_md5_suffix() {
        let table = "a_very_long_table_name_that_pushes_the_derived_index_identifier";
        let name = derive_index_name(table, &[CompactString::from("some_column_name")]);
        assert!(name.len() <= 64);
    }

    #[test]
    fn create_tables_orders_referenced_model_before_referencing_model() {
        let (user, book) = user_and_book();
        let mut conn = MockConnection::new();
        // Deliberately pass the dependent model first; creation must still
        // emit the referenced table's statement before it.
        create_tables(&mut conn, &TestDialect, &[book, user], true).unwrap();
        let statements = conn.statements();
        let user_idx = statements.iter().position(|s| s.contains("SchemaUser")).unwrap();
        let book_idx = statements
            .iter()
            .position(|s| s.contains("SchemaBook") && s.starts_with("CREATE TABLE"))
            .unwrap();
        assert!(user_idx < book_idx);
    }

    #[test]
    fn sequence_ddl_only_emitted_when_dialect_supports_it() {
        let n = crate::model::field::next_declaration_order();
        let meta = ModelMeta::builder(format!("SchemaSeq{n}"))
            .field(Rc::new(
                ScalarField::new("id", FieldKind::AutoField).primary_key().sequence("schemaseq_id_seq"),
            ))
            .unwrap()
            .build();
        let shared = registry::register_model(meta);
        let manager = SchemaManager::new(&shared);

        assert!(manager.create_sequences_sql(&TestDialect).is_empty());

        let created = manager.create_sequences_sql(&SequenceDialect);
        assert_eq!(created, vec![r#"CREATE SEQUENCE "schemaseq_id_seq""#.to_string()]);

        let dropped = manager.drop_sequences_sql(&SequenceDialect);
        assert_eq!(dropped, vec![r#"DROP SEQUENCE "schemaseq_id_seq""#.to_string()]);

        let ddl = manager.create_table_sql(&SequenceDialect, true, false).unwrap();
        assert!(ddl.contains("DEFAULT NEXTVAL('schemaseq_id_seq')"));
    }
}
