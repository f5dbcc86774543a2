//! Prefetch engine: batches N+1 follow-up queries for related sets (§4.8).
//!
//! Unlike the join materializer (§4.7), which reconstructs one object graph
//! per row of a single multi-table SELECT, prefetch runs one SELECT per
//! model and stitches the separately-fetched result sets together in
//! memory — the right shape when a relation is one-to-many and joining
//! would duplicate the "one" side's columns across every row.

use std::collections::HashMap;
use std::rc::Rc;

use compact_str::CompactString;

use crate::ast::{Column, Expression, Node, Ordering, Table};
use crate::builder::{SelectQuery, Statement};
use crate::dialect::Dialect;
use crate::driver::Connection;
use crate::error::{QuarryError, Result};
use crate::value::Value;

use super::field::Field;
use super::instance::Instance;
use super::join::primary_key_field;
use super::registry::SharedMeta;

/// One query in a prefetch chain: `Model.select()`, with every declared
/// field projected in `sorted_fields` order so rows can be materialized
/// without a separate column-name round trip.
#[derive(Clone)]
pub struct PrefetchQuery {
    meta: SharedMeta,
    query: SelectQuery,
    target: Option<SharedMeta>,
}

impl PrefetchQuery {
    pub fn new(meta: SharedMeta) -> Self {
        let table = Table::new(meta.borrow().table_name.clone());
        let columns = meta
            .borrow()
            .sorted_fields()
            .iter()
            .map(|f| Node::Column(Column::bare(f.column_name().clone())))
            .collect();
        let query = SelectQuery::new().from(Node::Table(table)).columns(columns);
        PrefetchQuery { meta, query, target: None }
    }

    pub fn where_(mut self, predicate: Node) -> Self {
        self.query = self.query.where_(predicate);
        self
    }

    pub fn order_by(mut self, orderings: Vec<Ordering>) -> Self {
        self.query = self.query.order_by(orderings);
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.query = self.query.limit(n);
        self
    }

    /// Disambiguates which earlier chain entry this subquery relates to
    /// (§4.8 step 1: "If `target_model` is specified, require that nearest
    /// to match").
    pub fn target(mut self, meta: SharedMeta) -> Self {
        self.target = Some(meta);
        self
    }
}

/// Which side of the relation holds the foreign key (§4.8 step 2).
enum Relation {
    /// This entry's model holds the FK(s): each of its rows gets a single
    /// `fk.name()` attribute pointing at its ancestor, and each matching
    /// ancestor gets a `{model}_set` list attribute (peewee's default
    /// backref name).
    ChildHoldsKey { ancestor_idx: usize, fields: Vec<Rc<dyn Field>> },
    /// The ancestor entry holds the FK(s): each ancestor row gets a single
    /// `fk.name()` attribute pointing at the matching instance of this
    /// entry — a plain many-to-one, no list involved.
    AncestorHoldsKey { ancestor_idx: usize, fields: Vec<Rc<dyn Field>> },
}

struct ChainEntry {
    meta: SharedMeta,
    query: SelectQuery,
    relation: Option<Relation>,
}

fn default_backref_name(owner_model_name: &str) -> CompactString {
    compact_str::format_compact!("{}_set", owner_model_name.to_lowercase())
}

fn fields_named(meta: &SharedMeta, names: &[CompactString]) -> Vec<Rc<dyn Field>> {
    let meta = meta.borrow();
    names.iter().filter_map(|n| meta.field(n).cloned()).collect()
}

/// Scans `chain` from the most recently added entry backward, looking for
/// a foreign key relation to or from `subquery_meta` (§4.8 step 1).
fn find_relation(chain: &[ChainEntry], subquery_meta: &SharedMeta, target: Option<&SharedMeta>) -> Result<Relation> {
    let subquery_name = subquery_meta.borrow().name.clone();

    for idx in (0..chain.len()).rev() {
        let ancestor = &chain[idx];
        if let Some(target) = target {
            if !Rc::ptr_eq(target, &ancestor.meta) {
                continue;
            }
        }

        let ancestor_name = ancestor.meta.borrow().name.clone();
        let child_fields = subquery_meta.borrow().model_refs.get(&ancestor_name).cloned();
        if let Some(names) = child_fields.filter(|v| !v.is_empty()) {
            return Ok(Relation::ChildHoldsKey {
                ancestor_idx: idx,
                fields: fields_named(subquery_meta, &names),
            });
        }

        let ancestor_fields = ancestor.meta.borrow().model_refs.get(&subquery_name).cloned();
        if let Some(names) = ancestor_fields.filter(|v| !v.is_empty()) {
            return Ok(Relation::AncestorHoldsKey {
                ancestor_idx: idx,
                fields: fields_named(&ancestor.meta, &names),
            });
        }
    }

    let hint = target.map(|t| format!(" using `{}`", t.borrow().name)).unwrap_or_default();
    Err(QuarryError::ImproperlyConfigured(
        format!("unable to find a foreign key relation for `{subquery_name}`{hint} among the preceding prefetch queries").into(),
    ))
}

/// `fk_col IN (SELECT ancestor_pk FROM ancestor_query)`, OR-reduced across
/// every candidate FK (§4.8 step 3).
fn rewrite_child_holds_key(entry_query: SelectQuery, ancestor: &ChainEntry, fields: &[Rc<dyn Field>]) -> Result<SelectQuery> {
    let pk_col = {
        let ancestor_meta = ancestor.meta.borrow();
        primary_key_field(&ancestor_meta)?.column_name().clone()
    };

    let mut predicate: Option<Node> = None;
    for field in fields {
        let subselect = ancestor.query.clone().columns(vec![Node::Column(Column::bare(pk_col.clone()))]);
        let clause = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(field.column_name().clone())),
            "IN",
            Node::Select(Box::new(subselect.into_select())),
        )));
        predicate = Some(match predicate {
            Some(existing) => Node::Expression(Box::new(Expression::new(existing, "OR", clause))),
            None => clause,
        });
    }
    let predicate = predicate.ok_or_else(|| QuarryError::Internal("prefetch relation had no candidate foreign keys".into()))?;
    Ok(entry_query.where_(predicate))
}

/// `subquery_pk IN (SELECT fk_col FROM ancestor_query)` — the mirror case
/// of [`rewrite_child_holds_key`], OR-reduced across every candidate FK.
fn rewrite_ancestor_holds_key(entry_query: SelectQuery, subquery_meta: &SharedMeta, ancestor: &ChainEntry, fields: &[Rc<dyn Field>]) -> Result<SelectQuery> {
    let pk_col = {
        let subquery_meta = subquery_meta.borrow();
        primary_key_field(&subquery_meta)?.column_name().clone()
    };

    let mut predicate: Option<Node> = None;
    for field in fields {
        let subselect = ancestor.query.clone().columns(vec![Node::Column(Column::bare(field.column_name().clone()))]);
        let clause = Node::Expression(Box::new(Expression::new(
            Node::Column(Column::bare(pk_col.clone())),
            "IN",
            Node::Select(Box::new(subselect.into_select())),
        )));
        predicate = Some(match predicate {
            Some(existing) => Node::Expression(Box::new(Expression::new(existing, "OR", clause))),
            None => clause,
        });
    }
    let predicate = predicate.ok_or_else(|| QuarryError::Internal("prefetch relation had no candidate foreign keys".into()))?;
    Ok(entry_query.where_(predicate))
}

fn execute_and_materialize(meta: &SharedMeta, query: &SelectQuery, conn: &mut dyn Connection, dialect: &Rc<dyn Dialect>) -> Result<Vec<Instance>> {
    let (sql, params) = query.to_sql(dialect.clone())?;
    crate::quarry_trace_prefetch!("query", meta.borrow().name);
    let (_, rows, _) = conn.execute(&sql, &params)?;
    let sorted: Vec<Rc<dyn Field>> = meta.borrow().sorted_fields().into_iter().cloned().collect();

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut instance = Instance::from_row(meta.clone());
            for (value, field) in row.iter().zip(sorted.iter()) {
                if !value.is_null() {
                    instance.set_clean(field.name().clone(), field.python_value(value));
                }
            }
            instance.mark_clean();
            instance
        })
        .collect())
}

/// A hashable surrogate for the `Value`s foreign keys are actually built
/// from; `Real`/`Blob`/`List`/`Null` never key a relation so they aren't
/// represented here.
#[derive(PartialEq, Eq, Hash, Clone)]
enum FkKey {
    Integer(i64),
    Text(CompactString),
}

fn fk_key(value: &Value) -> Option<FkKey> {
    match value {
        Value::Integer(i) => Some(FkKey::Integer(*i)),
        Value::Text(t) => Some(FkKey::Text(t.clone())),
        _ => None,
    }
}

/// Runs the root query plus every subquery, wiring matched relations
/// together, and returns the root's rows in their original order (§4.8).
///
/// `subqueries` is evaluated in order; each one's ancestor is discovered by
/// scanning every prior entry (root included) in reverse, preferring the
/// entry named by [`PrefetchQuery::target`] when set. Each query executes
/// exactly once (§4.8 guarantee).
pub fn prefetch(conn: &mut dyn Connection, dialect: &Rc<dyn Dialect>, root: PrefetchQuery, subqueries: Vec<PrefetchQuery>) -> Result<Vec<Rc<Instance>>> {
    let mut chain = vec![ChainEntry {
        meta: root.meta.clone(),
        query: root.query,
        relation: None,
    }];

    for sub in subqueries {
        let relation = find_relation(&chain, &sub.meta, sub.target.as_ref())?;
        let rewritten = match &relation {
            Relation::ChildHoldsKey { ancestor_idx, fields } => rewrite_child_holds_key(sub.query, &chain[*ancestor_idx], fields)?,
            Relation::AncestorHoldsKey { ancestor_idx, fields } => rewrite_ancestor_holds_key(sub.query, &sub.meta, &chain[*ancestor_idx], fields)?,
        };
        chain.push(ChainEntry {
            meta: sub.meta,
            query: rewritten,
            relation: Some(relation),
        });
    }

    // Every entry is frozen up front. Attachment below only ever mutates
    // through `Instance`'s `RefCell`-backed relation maps, so an ancestor
    // can be linked from more than one child relation without caring which
    // was processed first.
    let mut frozen: Vec<Vec<Rc<Instance>>> = Vec::with_capacity(chain.len());
    for entry in &chain {
        let instances = execute_and_materialize(&entry.meta, &entry.query, conn, dialect)?;
        frozen.push(instances.into_iter().map(Rc::new).collect());
    }

    for idx in 0..chain.len() {
        let Some(relation) = &chain[idx].relation else {
            continue;
        };

        match relation {
            Relation::ChildHoldsKey { ancestor_idx, fields } => {
                let mut by_fk: HashMap<FkKey, Vec<Rc<Instance>>> = HashMap::new();
                'rows: for instance in &frozen[idx] {
                    for field in fields {
                        if let Some(value) = instance.get(field.name()) {
                            if let Some(key) = fk_key(value) {
                                by_fk.entry(key).or_default().push(instance.clone());
                                continue 'rows;
                            }
                        }
                    }
                }

                let owner_name = chain[idx].meta.borrow().name.clone();
                let fk_attr = fields[0].name().clone();
                let backref_attr = default_backref_name(&owner_name);

                for ancestor in &frozen[*ancestor_idx] {
                    let children = ancestor
                        .primary_key_value()
                        .and_then(|pk| fk_key(&pk))
                        .and_then(|key| by_fk.get(&key).cloned())
                        .unwrap_or_default();
                    for child in &children {
                        child.attach_related(fk_attr.clone(), ancestor.clone());
                    }
                    ancestor.attach_related_many(backref_attr.clone(), children);
                }
            }
            Relation::AncestorHoldsKey { ancestor_idx, fields } => {
                let mut by_pk: HashMap<FkKey, Rc<Instance>> = HashMap::new();
                for instance in &frozen[idx] {
                    if let Some(pk) = instance.primary_key_value().and_then(|pk| fk_key(&pk)) {
                        by_pk.insert(pk, instance.clone());
                    }
                }

                for ancestor in &frozen[*ancestor_idx] {
                    for field in fields {
                        if let Some(key) = ancestor.get(field.name()).and_then(fk_key) {
                            if let Some(target) = by_pk.get(&key) {
                                ancestor.attach_related(field.name().clone(), target.clone());
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(frozen.remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test_support::{MockConnection, MockResponse};
    use crate::model::field::{FieldKind, ForeignKeyField, ScalarField};
    use crate::model::meta::ModelMeta;
    use crate::model::registry;

    #[derive(Debug)]
    struct TestDialect;
    impl Dialect for TestDialect {
        fn kind(&self) -> crate::dialect::DialectKind {
            crate::dialect::DialectKind::SQLite
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

    fn user_and_note_models() -> (SharedMeta, SharedMeta) {
        let n = crate::model::field::next_declaration_order();
        let user = ModelMeta::builder(format!("PrefetchUser{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("name", FieldKind::Text)))
            .unwrap()
            .build();
        let user_shared = registry::register_model(user);

        let note_fk = Rc::new(ForeignKeyField::new("user", user_shared.borrow().name.clone()));
        let note = ModelMeta::builder(format!("PrefetchNote{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("text", FieldKind::Text)))
            .unwrap()
            .foreign_key(note_fk)
            .unwrap()
            .build();
        let note_shared = registry::register_model(note);
        (user_shared, note_shared)
    }

    #[test]
    fn backref_prefetch_groups_children_under_their_parent() {
        let (user, note) = user_and_note_models();
        let note_owner_name = note.borrow().name.to_lowercase();

        let mut conn = MockConnection::new();
        conn.push_response(MockResponse {
            rows: vec![vec![Value::Integer(1), Value::from("ada")], vec![Value::Integer(2), Value::from("grace")]],
            ..Default::default()
        });
        conn.push_response(MockResponse {
            rows: vec![
                vec![Value::Integer(10), Value::from("hi"), Value::Integer(1)],
                vec![Value::Integer(11), Value::from("bye"), Value::Integer(1)],
                vec![Value::Integer(12), Value::from("yo"), Value::Integer(2)],
            ],
            ..Default::default()
        });

        let users = prefetch(&mut conn, &dialect(), PrefetchQuery::new(user.clone()), vec![PrefetchQuery::new(note.clone())]).unwrap();

        assert_eq!(users.len(), 2);
        let backref_attr = format!("{note_owner_name}_set");
        let ada_notes = users[0].get_related_many(&backref_attr).unwrap();
        assert_eq!(ada_notes.len(), 2);
        assert_eq!(ada_notes[0].get_related("user").unwrap().get("name"), Some(&Value::from("ada")));

        let grace_notes = users[1].get_related_many(&backref_attr).unwrap();
        assert_eq!(grace_notes.len(), 1);
        assert_eq!(grace_notes[0].get("text"), Some(&Value::from("yo")));
    }

    #[test]
    fn ancestor_holds_key_attaches_a_single_instance() {
        let n = crate::model::field::next_declaration_order();
        let author = ModelMeta::builder(format!("PrefetchAuthor{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("name", FieldKind::Text)))
            .unwrap()
            .build();
        let author_shared = registry::register_model(author);

        let book_fk = Rc::new(ForeignKeyField::new("author", author_shared.borrow().name.clone()));
        let book = ModelMeta::builder(format!("PrefetchBook{n}"))
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("title", FieldKind::Text)))
            .unwrap()
            .foreign_key(book_fk)
            .unwrap()
            .build();
        let book_shared = registry::register_model(book);

        let mut conn = MockConnection::new();
        conn.push_response(MockResponse {
            rows: vec![vec![Value::Integer(1), Value::from("Dune"), Value::Integer(9)]],
            ..Default::default()
        });
        conn.push_response(MockResponse {
            rows: vec![vec![Value::Integer(9), Value::from("Herbert")]],
            ..Default::default()
        });

        let books = prefetch(&mut conn, &dialect(), PrefetchQuery::new(book_shared), vec![PrefetchQuery::new(author_shared)]).unwrap();

        assert_eq!(books.len(), 1);
        let related = books[0].get_related("author").unwrap();
        assert_eq!(related.get("name"), Some(&Value::from("Herbert")));
    }
}
