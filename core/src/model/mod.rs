//! Model metadata, instance lifecycle, and join resolution (§3, §4.7, §6).

pub mod field;
mod instance;
pub mod join;
pub mod many_to_many;
pub mod meta;
pub mod registry;

pub use field::{DeferredForeignKey, Field, FieldConverter, FieldKind, ForeignKeyField, ReferentialAction, ScalarField};
pub use instance::{bulk_create, get_or_create, primary_key_predicate, Instance, SaveQuery};
pub use join::{infer_join_on, materialize_rows, JoinEdge, JoinKind, ProjectedField};
pub use many_to_many::{through_model, ManyToManySide};
pub use meta::{ModelIndex, ModelMeta, ModelMetaBuilder, PrimaryKey};
pub use registry::{lookup, register_model, SharedMeta};

use std::rc::Rc;

use crate::ast::{Column, Node, Table};
use crate::error::Result;

/// A record type backed by one [`ModelMeta`] (§3 "Model").
///
/// Concrete record types built on top of this crate implement `meta()` to
/// return their shared, process-(thread-)wide registered metadata; every
/// CRUD entry point — `select`, `get_by_id`, `save`, `delete_instance` — is
/// driven entirely off that metadata rather than per-type generated code,
/// matching this toolkit's runtime (not macro-driven) model layer.
pub trait Model {
    fn meta() -> SharedMeta;

    /// A fresh `Table` FROM-source for this model's table, distinct per
    /// call so repeated joins against the same model get independent
    /// aliases (§4.1).
    fn table() -> Rc<Table> {
        Table::new(Self::meta().borrow().table_name.clone())
    }

    /// `WHERE <primary key> = ?` predicate, for a single-column key (§8
    /// "Composite PK" covers the multi-column form via
    /// [`primary_key_predicate`] directly).
    fn pk_column() -> Result<Node> {
        let meta = Self::meta();
        let meta = meta.borrow();
        let names = meta.primary_key_field_names();
        let name = names
            .first()
            .ok_or_else(|| crate::error::QuarryError::ImproperlyConfigured("model has no primary key".into()))?;
        let field = meta
            .field(name)
            .ok_or_else(|| crate::error::QuarryError::Internal("primary key field missing from metadata".into()))?;
        Ok(Node::Column(Column::bare(field.column_name().clone())))
    }
}
