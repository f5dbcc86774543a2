//! Record instance state and lifecycle (§3 "Instance state", "Lifecycle").

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::ast::{Column, Expression, Node, Table};
use crate::builder::{DeleteQuery, InsertQuery, Statement, UpdateQuery};
use crate::dialect::Dialect;
use crate::driver::Connection;
use crate::error::{QuarryError, Result};
use crate::value::Value;

use super::field::Field;
use super::meta::{ModelMeta, PrimaryKey};
use super::registry::{self, SharedMeta};

/// One record: field values, cached related-instance lookups, and the set
/// of field names changed since load/save (§3). Relations live behind a
/// `RefCell` because the prefetch engine (§4.8) wires an ancestor's
/// backref list and a child's single-instance attribute onto each other's
/// *already-shared* `Rc<Instance>` — the join materializer (§4.7) never
/// needs this and only ever attaches before an instance is first shared.
#[derive(Debug, Clone)]
pub struct Instance {
    meta: SharedMeta,
    data: IndexMap<CompactString, Value>,
    rel: RefCell<IndexMap<CompactString, Rc<Instance>>>,
    rel_many: RefCell<IndexMap<CompactString, Vec<Rc<Instance>>>>,
    dirty: HashSet<CompactString>,
}

/// Either half of a `save()` dispatch (§3 "save issues INSERT if primary
/// key is absent... else UPDATE").
pub enum SaveQuery {
    Insert(InsertQuery),
    Update(UpdateQuery),
}

impl Instance {
    /// A newly constructed record: scalar defaults are copied in and
    /// marked dirty (§3 "Construction with keyword arguments applies
    /// scalar defaults... and marks their names dirty").
    pub fn new(meta: SharedMeta) -> Self {
        let mut data = IndexMap::new();
        let mut dirty = HashSet::new();
        for field in meta.borrow().fields.values() {
            if let Some(default) = field.scalar_default() {
                data.insert(field.name().clone(), default);
                dirty.insert(field.name().clone());
            }
        }
        Instance {
            meta,
            data,
            rel: RefCell::new(IndexMap::new()),
            rel_many: RefCell::new(IndexMap::new()),
            dirty,
        }
    }

    /// A row freshly pulled off a cursor: no defaults applied, `dirty`
    /// empty (§3 "freshly-materialized rows must have `dirty` empty", §8
    /// "materialized rows start non-dirty").
    pub fn from_row(meta: SharedMeta) -> Self {
        Instance {
            meta,
            data: IndexMap::new(),
            rel: RefCell::new(IndexMap::new()),
            rel_many: RefCell::new(IndexMap::new()),
            dirty: HashSet::new(),
        }
    }

    pub fn meta(&self) -> &SharedMeta {
        &self.meta
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Assigns a field, marking it dirty (§8 "after attribute assignment,
    /// the field's name is in `dirty`").
    pub fn set(&mut self, field: impl Into<CompactString>, value: Value) {
        let field = field.into();
        self.data.insert(field.clone(), value);
        self.dirty.insert(field);
    }

    /// Populates a row's value without marking it dirty — used by the
    /// materializer (§4.7 step 2 "assign `converter(row[i])`").
    pub fn set_clean(&mut self, field: impl Into<CompactString>, value: Value) {
        self.data.insert(field.into(), value);
    }

    pub fn get_related(&self, attr: &str) -> Option<Rc<Instance>> {
        self.rel.borrow().get(attr).cloned()
    }

    /// Takes `&self`, not `&mut self`: attachment must remain possible
    /// after this instance has already been shared as an `Rc<Instance>`
    /// (§4.8's ancestor/child cross-wiring).
    pub fn attach_related(&self, attr: impl Into<CompactString>, instance: Rc<Instance>) {
        self.rel.borrow_mut().insert(attr.into(), instance);
    }

    /// The list half of a relation attachment — a backref collection
    /// (§4.8 "set child.backref = [parent…]").
    pub fn get_related_many(&self, attr: &str) -> Option<Vec<Rc<Instance>>> {
        self.rel_many.borrow().get(attr).cloned()
    }

    pub fn attach_related_many(&self, attr: impl Into<CompactString>, instances: Vec<Rc<Instance>>) {
        self.rel_many.borrow_mut().insert(attr.into(), instances);
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_fields(&self) -> &HashSet<CompactString> {
        &self.dirty
    }

    /// Clears `dirty` — called after a successful `save()` (§8 "after
    /// `save()`, `dirty` is empty") and by the materializer after
    /// constructing a row (§4.7 "Clear `dirty` on all constructed record
    /// instances").
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn primary_key_value(&self) -> Option<Value> {
        match &self.meta.borrow().primary_key {
            PrimaryKey::Single(name) => self.data.get(name).cloned(),
            PrimaryKey::Composite(_) | PrimaryKey::None => None,
        }
    }

    fn row_for_insert(&self) -> IndexMap<CompactString, Node> {
        let meta = self.meta.borrow();
        let mut row = IndexMap::new();
        for field in meta.sorted_fields() {
            if let Some(value) = self.data.get(field.name()) {
                row.insert(field.column_name().clone(), Node::value(value.clone()));
            }
        }
        row
    }

    /// Builds the INSERT or UPDATE this instance's current state implies
    /// (§3 Lifecycle). `force_insert` mirrors `Model.save(force_insert=True)`.
    pub fn build_save_query(&self, force_insert: bool) -> Result<SaveQuery> {
        let meta = self.meta.borrow();
        let table = Table::new(meta.table_name.clone());

        if force_insert || self.primary_key_value().is_none() {
            return Ok(SaveQuery::Insert(InsertQuery::simple(table, self.row_for_insert())));
        }

        let pk_name = match &meta.primary_key {
            PrimaryKey::Single(name) => name.clone(),
            _ => {
                return Err(QuarryError::ImproperlyConfigured(
                    "UPDATE-by-instance requires a single-field primary key".into(),
                ))
            }
        };
        let pk_field = meta
            .field(&pk_name)
            .ok_or_else(|| QuarryError::Internal("primary key field missing from metadata".into()))?;
        let pk_value = self
            .data
            .get(&pk_name)
            .cloned()
            .ok_or_else(|| QuarryError::ImproperlyConfigured("instance has no primary key value set".into()))?;

        let only_dirty = meta.only_save_dirty;
        let mut assignments = IndexMap::new();
        for field in meta.fields.values() {
            if field.name() == &pk_name {
                continue;
            }
            if only_dirty && !self.dirty.contains(field.name()) {
                continue;
            }
            if let Some(value) = self.data.get(field.name()) {
                assignments.insert(field.column_name().clone(), Node::value(value.clone()));
            }
        }

        let predicate = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(pk_field.column_name().clone())),
            "=",
            Node::value(pk_value),
        )));
        Ok(SaveQuery::Update(UpdateQuery::new(table, assignments).where_(predicate)))
    }

    /// Executes `build_save_query`, populating the primary key from the
    /// driver-reported last-row-id on INSERT, and clearing `dirty` (§3,
    /// §8).
    pub fn save(
        &mut self,
        conn: &mut dyn Connection,
        dialect: &Rc<dyn Dialect>,
        force_insert: bool,
    ) -> Result<()> {
        let query = self.build_save_query(force_insert)?;
        let is_insert = matches!(query, SaveQuery::Insert(_));
        let (sql, params) = match query {
            SaveQuery::Insert(q) => q.to_sql(dialect.clone())?,
            SaveQuery::Update(q) => q.to_sql(dialect.clone())?,
        };
        let (_, _, last_insert_id) = conn.execute(&sql, &params)?;

        if is_insert {
            if let (Some(id), PrimaryKey::Single(pk_name)) =
                (last_insert_id, self.meta.borrow().primary_key.clone())
            {
                self.data.insert(pk_name, Value::Integer(id));
            }
        }
        self.mark_clean();
        Ok(())
    }

    /// Walks the backref graph, deleting (or, for nullable FKs when
    /// `delete_nullable` is false, nulling) dependents before deleting
    /// self (§3 `delete_instance`). Model-graph cycles are broken with a
    /// seen-set per §9's open-question resolution.
    pub fn delete_instance(
        &self,
        conn: &mut dyn Connection,
        dialect: &Rc<dyn Dialect>,
        recursive: bool,
        delete_nullable: bool,
    ) -> Result<()> {
        let pk_value = self
            .primary_key_value()
            .ok_or_else(|| QuarryError::ImproperlyConfigured("cannot delete an instance with no primary key value".into()))?;

        if recursive {
            let mut seen = HashSet::new();
            cascade_delete(&self.meta, pk_value.clone(), conn, dialect, delete_nullable, &mut seen)?;
        }

        let meta = self.meta.borrow();
        let pk_name = match &meta.primary_key {
            PrimaryKey::Single(name) => name.clone(),
            _ => {
                return Err(QuarryError::ImproperlyConfigured(
                    "delete-by-instance requires a single-field primary key".into(),
                ))
            }
        };
        let pk_field = meta
            .field(&pk_name)
            .ok_or_else(|| QuarryError::Internal("primary key field missing from metadata".into()))?;
        let table = Table::new(meta.table_name.clone());
        let predicate = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(pk_field.column_name().clone())),
            "=",
            Node::value(pk_value),
        )));
        let (sql, params) = DeleteQuery::new(table).where_(predicate).to_sql(dialect.clone())?;
        conn.execute(&sql, &params)?;
        Ok(())
    }
}

/// Recursively deletes/nulls every row across every model that transitively
/// depends (via a FK) on the row identified by `(meta, pk_value)`, depth
/// first — dependents of dependents are removed before the dependents
/// themselves, which in turn are removed before `delete_instance`'s own
/// final DELETE (§3).
fn cascade_delete(
    meta: &SharedMeta,
    pk_value: Value,
    conn: &mut dyn Connection,
    dialect: &Rc<dyn Dialect>,
    delete_nullable: bool,
    seen: &mut HashSet<CompactString>,
) -> Result<()> {
    let model_key = meta.borrow().name.to_lowercase();
    if !seen.insert(model_key.into()) {
        return Ok(());
    }

    let backrefs: Vec<(CompactString, CompactString)> = meta
        .borrow()
        .model_backrefs
        .iter()
        .flat_map(|(owner, fields)| fields.iter().map(move |f| (owner.clone(), f.clone())))
        .collect();

    for (owner_name, field_name) in backrefs {
        let Some(owner_meta) = registry::lookup(&owner_name) else {
            continue;
        };
        let field: Rc<dyn Field> = match owner_meta.borrow().field(&field_name) {
            Some(f) => f.clone(),
            None => continue,
        };
        let owner_table_name = owner_meta.borrow().table_name.clone();
        let owner_pk_name = match &owner_meta.borrow().primary_key {
            PrimaryKey::Single(name) => Some(name.clone()),
            _ => None,
        };

        // Discover dependent rows' primary keys so their own dependents
        // can be cascaded into first.
        if let Some(owner_pk_name) = &owner_pk_name {
            let owner_pk_column = owner_meta
                .borrow()
                .field(owner_pk_name)
                .map(|f| f.column_name().clone());
            if let Some(owner_pk_column) = owner_pk_column {
                let select = crate::builder::SelectQuery::new()
                    .from(Node::Table(Table::new(owner_table_name.clone())))
                    .columns(vec![Node::Column(Column::bare(owner_pk_column))])
                    .where_(Node::Expression(Box::new(Expression::new(
                        Node::Column(Column::bare(field.column_name().clone())),
                        "=",
                        Node::value(pk_value.clone()),
                    ))));
                let (sql, params) = select.to_sql(dialect.clone())?;
                let (_, rows, _) = conn.execute(&sql, &params)?;
                for row in rows {
                    if let Some(child_pk) = row.first().cloned() {
                        cascade_delete(&owner_meta, child_pk, conn, dialect, delete_nullable, seen)?;
                    }
                }
            }
        }

        let predicate = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(field.column_name().clone())),
            "=",
            Node::value(pk_value.clone()),
        )));
        let table = Table::new(owner_table_name);

        if field.null() && !delete_nullable {
            let mut assignments = IndexMap::new();
            assignments.insert(field.column_name().clone(), Node::value(Value::Null));
            let (sql, params) = UpdateQuery::new(table, assignments)
                .where_(predicate)
                .to_sql(dialect.clone())?;
            conn.execute(&sql, &params)?;
        } else {
            let (sql, params) = DeleteQuery::new(table).where_(predicate).to_sql(dialect.clone())?;
            conn.execute(&sql, &params)?;
        }
    }

    Ok(())
}

/// `Model.get_by_id` / `Model.get_by_id((a, b))` predicate builder (§8
/// "Composite PK" testable property): emits `c1 = ? AND c2 = ?` in
/// declared `field_names` order.
pub fn primary_key_predicate(meta: &ModelMeta, values: &[Value]) -> Result<Node> {
    let names = meta.primary_key_field_names();
    if names.len() != values.len() {
        return Err(QuarryError::ImproperlyConfigured(
            "primary key value count does not match the declared key".into(),
        ));
    }
    let mut predicate: Option<Node> = None;
    for (name, value) in names.iter().zip(values.iter()) {
        let field = meta
            .field(name)
            .ok_or_else(|| QuarryError::Internal("primary key field missing from metadata".into()))?;
        let clause = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(field.column_name().clone())),
            "=",
            Node::value(value.clone()),
        )));
        predicate = Some(match predicate {
            Some(existing) => Node::Expression(Box::new(Expression::new(existing, "AND", clause))),
            None => clause,
        });
    }
    predicate.ok_or_else(|| QuarryError::ImproperlyConfigured("model has no primary key".into()))
}

/// `Model.get_or_create(**lookup, defaults=...)` (§9 supplemented
/// feature): a SELECT by `lookup`, falling back to constructing and
/// saving a new instance (`lookup` merged with `defaults`) on a miss.
/// Pure composition over the existing SELECT/INSERT builders — no new
/// node or statement kind.
pub fn get_or_create(
    meta: &SharedMeta,
    conn: &mut dyn Connection,
    dialect: &Rc<dyn Dialect>,
    lookup: IndexMap<CompactString, Value>,
    defaults: IndexMap<CompactString, Value>,
) -> Result<(Instance, bool)> {
    let (table_name, sorted_fields): (CompactString, Vec<Rc<dyn Field>>) = {
        let borrowed = meta.borrow();
        (borrowed.table_name.clone(), borrowed.sorted_fields().into_iter().cloned().collect())
    };

    let mut predicate: Option<Node> = None;
    for (name, value) in &lookup {
        let field = meta
            .borrow()
            .field(name)
            .cloned()
            .ok_or_else(|| QuarryError::ImproperlyConfigured(format!("no field named `{name}`").into()))?;
        let clause = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(field.column_name().clone())),
            "=",
            Node::value(value.clone()),
        )));
        predicate = Some(match predicate {
            Some(existing) => Node::Expression(Box::new(Expression::new(existing, "AND", clause))),
            None => clause,
        });
    }
    let predicate = predicate.ok_or_else(|| QuarryError::ImproperlyConfigured("get_or_create needs at least one lookup field".into()))?;

    let select = crate::builder::SelectQuery::new()
        .from(Node::Table(Table::new(table_name.clone())))
        .columns(sorted_fields.iter().map(|f| Node::Column(Column::bare(f.column_name().clone()))).collect())
        .where_(predicate);
    let (sql, params) = select.to_sql(dialect.clone())?;
    let (_, mut rows, _) = conn.execute(&sql, &params)?;

    if let Some(row) = rows.pop() {
        let mut instance = Instance::from_row(meta.clone());
        for (value, field) in row.iter().zip(sorted_fields.iter()) {
            if !value.is_null() {
                instance.set_clean(field.name().clone(), field.python_value(value));
            }
        }
        return Ok((instance, false));
    }

    let mut instance = Instance::new(meta.clone());
    for (name, value) in lookup.into_iter().chain(defaults) {
        instance.set(name, value);
    }
    instance.save(conn, dialect, true)?;
    Ok((instance, true))
}

/// `Model.bulk_create(rows)` (§9 supplemented feature): a single
/// multi-row INSERT built from each row's field map, sharing the
/// existing `InsertQuery::multi` shape rather than issuing one INSERT
/// per row.
pub fn bulk_create(
    meta: &SharedMeta,
    conn: &mut dyn Connection,
    dialect: &Rc<dyn Dialect>,
    rows: Vec<IndexMap<CompactString, Value>>,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let table_name = meta.borrow().table_name.clone();
    let column_of = |name: &str| -> Result<CompactString> {
        meta.borrow()
            .field(name)
            .map(|f| f.column_name().clone())
            .ok_or_else(|| QuarryError::ImproperlyConfigured(format!("no field named `{name}`").into()))
    };

    let mut insert_rows = Vec::with_capacity(rows.len());
    for row in rows {
        let mut insert_row = IndexMap::new();
        for (name, value) in row {
            insert_row.insert(column_of(&name)?, Node::value(value));
        }
        insert_rows.push(insert_row);
    }

    let table = Table::new(table_name);
    let (sql, params) = InsertQuery::multi(table, insert_rows, None).to_sql(dialect.clone())?;
    conn.execute(&sql, &params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;
    use crate::driver::test_support::{MockConnection, MockResponse};
    use crate::model::field::{FieldKind, ScalarField};

    /// Bare-bones ANSI-ish dialect, local to these tests — the concrete
    /// SQLite/Postgres/MySQL dialects live in their own crates and aren't a
    /// dependency of `quarry-core`.
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
            semantic.into()
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

    fn dialect() -> Rc<dyn Dialect> {
        Rc::new(TestDialect)
    }

    fn user_meta() -> SharedMeta {
        let meta = ModelMeta::builder(format!("InstanceTestUser{}", next_declaration_order_probe()))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("name", FieldKind::Text)))
            .unwrap()
            .build();
        registry::register_model(meta)
    }

    // Declaration order is a global counter; give every test its own model
    // name so the registry doesn't collide across parallel test threads.
    fn next_declaration_order_probe() -> u64 {
        super::super::field::next_declaration_order()
    }

    #[test]
    fn missing_primary_key_builds_an_insert() {
        let meta = user_meta();
        let table = meta.borrow().table_name.clone();
        let mut instance = Instance::from_row(meta);
        instance.set("name", Value::from("ada"));

        let (sql, params) = match instance.build_save_query(false).unwrap() {
            SaveQuery::Insert(q) => q.to_sql(dialect()).unwrap(),
            SaveQuery::Update(_) => panic!("expected an INSERT"),
        };
        assert_eq!(sql, format!(r#"INSERT INTO "{table}" ("name") VALUES (?)"#));
        assert_eq!(params, vec![Value::from("ada")]);
    }

    #[test]
    fn present_primary_key_builds_an_update_over_dirty_fields_only() {
        let meta = user_meta();
        meta.borrow_mut().only_save_dirty = true;
        let mut instance = Instance::from_row(meta.clone());
        instance.set_clean("id", Value::Integer(7));
        instance.set("name", Value::from("grace"));
        assert!(instance.is_dirty());

        let (sql, params) = match instance.build_save_query(false).unwrap() {
            SaveQuery::Update(q) => q.to_sql(dialect()).unwrap(),
            SaveQuery::Insert(_) => panic!("expected an UPDATE"),
        };
        let table = meta.borrow().table_name.clone();
        assert_eq!(
            sql,
            format!(r#"UPDATE "{table}" SET "name" = ? WHERE "id" = ?"#)
        );
        assert_eq!(params, vec![Value::from("grace"), Value::Integer(7)]);
    }

    #[test]
    fn save_populates_primary_key_from_last_insert_id_and_clears_dirty() {
        let meta = user_meta();
        let mut instance = Instance::new(meta);
        instance.set("name", Value::from("lin"));
        assert!(instance.is_dirty());

        let mut conn = MockConnection::new();
        conn.push_response(MockResponse {
            last_insert_id: Some(42),
            ..Default::default()
        });
        instance.save(&mut conn, &dialect(), false).unwrap();

        assert_eq!(instance.get("id"), Some(&Value::Integer(42)));
        assert!(!instance.is_dirty());
    }

    #[test]
    fn fresh_row_from_materializer_starts_clean() {
        let meta = user_meta();
        let instance = Instance::from_row(meta);
        assert!(!instance.is_dirty());
    }

    #[test]
    fn delete_instance_cascades_to_direct_dependent_before_deleting_self() {
        let parent = user_meta();
        let parent_table = parent.borrow().table_name.clone();

        let child_fk = Rc::new(
            crate::model::field::ForeignKeyField::new("owner", parent.borrow().name.clone()),
        );
        let child = ModelMeta::builder(format!("InstanceTestChild{}", next_declaration_order_probe()))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .foreign_key(child_fk)
            .unwrap()
            .build();
        let child_shared = registry::register_model(child);
        let child_table = child_shared.borrow().table_name.clone();
        assert!(parent.borrow().model_backrefs.contains_key(child_shared.borrow().name.as_str()));

        let mut instance = Instance::from_row(parent);
        instance.set_clean("id", Value::Integer(5));

        let mut conn = MockConnection::new();
        // First call: SELECT dependent pks (none found). Second: DELETE self.
        conn.push_response(MockResponse::default());
        conn.push_response(MockResponse::default());
        instance
            .delete_instance(&mut conn, &dialect(), true, false)
            .unwrap();

        let statements = conn.statements();
        assert!(statements[0].contains(&child_table.to_string()));
        assert!(statements.last().unwrap().contains(&parent_table.to_string()));
    }

    #[test]
    fn get_or_create_returns_existing_row_without_inserting() {
        let meta = user_meta();
        let mut conn = MockConnection::new();
        conn.push_response(MockResponse {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![Value::Integer(1), Value::from("ada")]],
            last_insert_id: None,
        });

        let mut lookup = IndexMap::new();
        lookup.insert(CompactString::from("name"), Value::from("ada"));
        let (instance, created) = get_or_create(&meta, &mut conn, &dialect(), lookup, IndexMap::new()).unwrap();

        assert!(!created);
        assert_eq!(instance.get("id"), Some(&Value::Integer(1)));
        assert_eq!(conn.statements().len(), 1);
    }

    #[test]
    fn get_or_create_inserts_a_new_row_on_a_miss() {
        let meta = user_meta();
        let mut conn = MockConnection::new();
        conn.push_response(MockResponse::default());
        conn.push_response(MockResponse { last_insert_id: Some(9), ..Default::default() });

        let mut lookup = IndexMap::new();
        lookup.insert(CompactString::from("name"), Value::from("grace"));
        let (instance, created) = get_or_create(&meta, &mut conn, &dialect(), lookup, IndexMap::new()).unwrap();

        assert!(created);
        assert_eq!(instance.get("id"), Some(&Value::Integer(9)));
        assert_eq!(conn.statements().len(), 2);
        assert!(conn.statements()[1].starts_with("INSERT"));
    }

    #[test]
    fn bulk_create_issues_a_single_multi_row_insert() {
        let meta = user_meta();
        let mut conn = MockConnection::new();
        conn.push_response(MockResponse::default());

        let mut row1 = IndexMap::new();
        row1.insert(CompactString::from("name"), Value::from("ada"));
        let mut row2 = IndexMap::new();
        row2.insert(CompactString::from("name"), Value::from("grace"));
        bulk_create(&meta, &mut conn, &dialect(), vec![row1, row2]).unwrap();

        let statements = conn.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("VALUES"));
    }
}
