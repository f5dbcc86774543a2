//! Join-on inference and the join-aware row materializer (§4.7).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use compact_str::CompactString;

use crate::ast::{Column, Expression, Node};
use crate::cursor::RawRow;
use crate::error::{QuarryError, Result};

use super::field::Field;
use super::meta::ModelMeta;
use super::registry::SharedMeta;
use super::Instance;

/// Whether a join edge follows a foreign key forward (child -> parent) or
/// backward (parent -> a referencing child) (§4.7 "classify forward vs
/// backref").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Forward,
    Backref,
}

/// One FROM/JOIN edge, used to drive the materializer's attach step.
#[derive(Debug, Clone)]
pub struct JoinEdge {
    pub from_model: SharedMeta,
    pub to_model: SharedMeta,
    pub kind: JoinKind,
    /// Attribute name the materializer installs the related object under,
    /// on `from_model`'s instance.
    pub attr: CompactString,
}

/// A projected column's owning model and field, resolved once before the
/// row loop (§4.7 step 1: "compute columns[i]... infer owning-model key +
/// `python_value` converter per projected node").
#[derive(Debug, Clone)]
pub struct ProjectedField {
    pub model: SharedMeta,
    pub field_name: CompactString,
}

fn resolve_candidate(owner: &str, target: &str, candidates: &[CompactString], explicit: Option<&str>) -> Result<CompactString> {
    if let Some(name) = explicit {
        return candidates
            .iter()
            .find(|c| c.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                QuarryError::ImproperlyConfigured(
                    format!("`{owner}` has no foreign key named `{name}` to `{target}`").into(),
                )
            });
    }
    match candidates {
        [one] => Ok(one.clone()),
        [] => Err(QuarryError::ImproperlyConfigured(
            format!("no foreign key relationship found between `{owner}` and `{target}`").into(),
        )),
        _ => Err(QuarryError::ImproperlyConfigured(
            format!("ambiguous join between `{owner}` and `{target}`: specify `to_field`").into(),
        )),
    }
}

pub(crate) fn primary_key_field<'a>(meta: &'a ModelMeta) -> Result<&'a Rc<dyn Field>> {
    let names = meta.primary_key_field_names();
    let name = names.first().ok_or_else(|| {
        QuarryError::ImproperlyConfigured(format!("model `{}` has no primary key to join on", meta.name).into())
    })?;
    meta.field(name)
        .ok_or_else(|| QuarryError::Internal("primary key field missing from metadata".into()))
}

fn eq_columns(lhs: &CompactString, rhs: &CompactString) -> Node {
    Node::Expression(Box::new(Expression::new(
        Node::Column(Column::bare(lhs.clone())),
        "=",
        Node::Column(Column::bare(rhs.clone())),
    )))
}

/// `from_model` holds a foreign key pointing at `to_model`.
fn infer_forward_join(from_model: &SharedMeta, to_model: &SharedMeta, to_field: Option<&str>) -> Result<(Node, JoinEdge)> {
    let from = from_model.borrow();
    let to = to_model.borrow();
    let candidates = from.model_refs.get(&to.name).cloned().unwrap_or_default();
    let field_name = resolve_candidate(&from.name, &to.name, &candidates, to_field)?;
    let fk_field = from
        .field(&field_name)
        .ok_or_else(|| QuarryError::Internal("fk field missing from metadata".into()))?;
    let to_pk_field = primary_key_field(&to)?;
    let predicate = eq_columns(fk_field.column_name(), to_pk_field.column_name());
    Ok((
        predicate,
        JoinEdge {
            from_model: from_model.clone(),
            to_model: to_model.clone(),
            kind: JoinKind::Forward,
            attr: field_name,
        },
    ))
}

/// `to_model` holds a foreign key pointing back at `from_model`.
fn infer_backref_join(from_model: &SharedMeta, to_model: &SharedMeta, via_field: Option<&str>) -> Result<(Node, JoinEdge)> {
    let from = from_model.borrow();
    let to = to_model.borrow();
    let candidates = to.model_refs.get(&from.name).cloned().unwrap_or_default();
    let field_name = resolve_candidate(&to.name, &from.name, &candidates, via_field)?;
    let fk_field = to
        .field(&field_name)
        .ok_or_else(|| QuarryError::Internal("fk field missing from metadata".into()))?;
    let from_pk_field = primary_key_field(&from)?;
    let predicate = eq_columns(from_pk_field.column_name(), fk_field.column_name());
    Ok((
        predicate,
        JoinEdge {
            from_model: from_model.clone(),
            to_model: to_model.clone(),
            kind: JoinKind::Backref,
            attr: field_name,
        },
    ))
}

/// `_generate_on_clause` equivalent: infers the join predicate between two
/// models, trying a forward FK first, then a backref, erroring when
/// neither exists or the relation is ambiguous (§4.7). `to_field` narrows
/// the candidate when a model has more than one FK toward the other.
pub fn infer_join_on(from_model: &SharedMeta, to_model: &SharedMeta, to_field: Option<&str>) -> Result<(Node, JoinEdge)> {
    match infer_forward_join(from_model, to_model, to_field) {
        Ok(result) => Ok(result),
        Err(forward_err) => infer_backref_join(from_model, to_model, to_field).map_err(|_| forward_err),
    }
}

/// Builds one instance per discovered model per row from a flat row of
/// values, attaches related instances along `edges`, and returns the root
/// model's instances in row order (§4.7 algorithm).
///
/// `edges` must be ordered leaf-to-root: an edge's `to_model` is fully
/// attached to its own further relations before it is consumed as some
/// other edge's related object.
pub fn materialize_rows(
    root: &SharedMeta,
    edges: &[JoinEdge],
    projected: &[ProjectedField],
    rows: Vec<RawRow>,
) -> Result<Vec<Rc<Instance>>> {
    let root_key = root.borrow().name.clone();
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let mut built: HashMap<CompactString, Instance> = HashMap::new();
        let mut set_keys: HashSet<CompactString> = HashSet::new();

        for (value, proj) in row.iter().zip(projected.iter()) {
            if value.is_null() {
                continue;
            }
            let model_key = proj.model.borrow().name.clone();
            let field = proj.model.borrow().field(&proj.field_name).cloned();
            let converted = field
                .as_ref()
                .map(|f| f.python_value(value))
                .unwrap_or_else(|| value.clone());
            built
                .entry(model_key.clone())
                .or_insert_with(|| Instance::from_row(proj.model.clone()))
                .set_clean(proj.field_name.clone(), converted);
            set_keys.insert(model_key);
        }

        let mut finished: HashMap<CompactString, Rc<Instance>> = HashMap::new();
        for edge in edges {
            let target_key = edge.to_model.borrow().name.clone();
            // NULL-safe: an outer join with no matching row leaves every
            // column of `to_model` NULL, so no key was ever set for it.
            if !set_keys.contains(&target_key) {
                continue;
            }
            if !finished.contains_key(&target_key) {
                if let Some(mut instance) = built.remove(&target_key) {
                    instance.mark_clean();
                    finished.insert(target_key.clone(), Rc::new(instance));
                }
            }
            let Some(target_instance) = finished.get(&target_key).cloned() else {
                continue;
            };
            let owner_key = edge.from_model.borrow().name.clone();
            if let Some(owner) = built.get_mut(&owner_key) {
                owner.attach_related(edge.attr.clone(), target_instance);
            }
        }

        if let Some(mut root_instance) = built.remove(&root_key) {
            root_instance.mark_clean();
            out.push(Rc::new(root_instance));
        } else if let Some(root_instance) = finished.remove(&root_key) {
            out.push(root_instance);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{FieldKind, ScalarField};
    use crate::model::meta::ModelMeta;
    use crate::model::registry;
    use crate::value::Value;

    fn author_and_book() -> (SharedMeta, SharedMeta) {
        let author = ModelMeta::builder("JoinTestAuthor")
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("name", FieldKind::Text)))
            .unwrap()
            .build();
        let author_shared = registry::register_model(author);

        let book_fk = Rc::new(super::super::field::ForeignKeyField::new("author", "JoinTestAuthor"));
        let book = ModelMeta::builder("JoinTestBook")
            .field(Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key()))
            .unwrap()
            .field(Rc::new(ScalarField::new("title", FieldKind::Text)))
            .unwrap()
            .foreign_key(book_fk)
            .unwrap()
            .build();
        let book_shared = registry::register_model(book);
        (author_shared, book_shared)
    }

    #[test]
    fn infers_forward_join_from_single_candidate_fk() {
        let (author, book) = author_and_book();
        let (_predicate, edge) = infer_join_on(&book, &author, None).unwrap();
        assert_eq!(edge.kind, JoinKind::Forward);
        assert_eq!(edge.attr.as_str(), "author");
    }

    #[test]
    fn infers_backref_join_when_only_a_reverse_fk_exists() {
        let (author, book) = author_and_book();
        let (_predicate, edge) = infer_join_on(&author, &book, None).unwrap();
        assert_eq!(edge.kind, JoinKind::Backref);
    }

    #[test]
    fn materializes_one_row_into_two_instances_joined_by_attr() {
        let (author, book) = author_and_book();
        let (_predicate, edge) = infer_join_on(&book, &author, None).unwrap();

        let projected = vec![
            ProjectedField { model: book.clone(), field_name: "id".into() },
            ProjectedField { model: book.clone(), field_name: "title".into() },
            ProjectedField { model: author.clone(), field_name: "id".into() },
            ProjectedField { model: author.clone(), field_name: "name".into() },
        ];
        let rows = vec![vec![
            Value::Integer(1),
            Value::from("Dune"),
            Value::Integer(9),
            Value::from("Herbert"),
        ]];

        let instances = materialize_rows(&book, &[edge], &projected, rows).unwrap();
        assert_eq!(instances.len(), 1);
        let book_instance = &instances[0];
        assert_eq!(book_instance.get("title"), Some(&Value::from("Dune")));
        let related = book_instance.get_related("author").unwrap();
        assert_eq!(related.get("name"), Some(&Value::from("Herbert")));
        assert!(!book_instance.is_dirty());
    }

    #[test]
    fn outer_join_with_no_match_leaves_relation_unattached() {
        let (author, book) = author_and_book();
        let (_predicate, edge) = infer_join_on(&book, &author, None).unwrap();

        let projected = vec![
            ProjectedField { model: book.clone(), field_name: "id".into() },
            ProjectedField { model: author.clone(), field_name: "id".into() },
        ];
        let rows = vec![vec![Value::Integer(1), Value::Null]];

        let instances = materialize_rows(&book, &[edge], &projected, rows).unwrap();
        assert!(instances[0].get_related("author").is_none());
    }
}
