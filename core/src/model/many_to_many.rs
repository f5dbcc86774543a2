//! `ManyToMany` convenience: assembles a through-model's two `ForeignKey`s
//! instead of introducing new AST (§1 SUPPLEMENTED FEATURES).
//!
//! The source's `ManyToManyField` dynamically generates a through model at
//! class-construction time with two `ForeignKeyField`s and a composite
//! unique index over them. This crate has no macro/codegen layer to
//! generate a type at that point, so the equivalent is a builder step
//! applied to a through-model's own `ModelMetaBuilder` that the caller
//! constructs explicitly.

use compact_str::CompactString;
use std::rc::Rc;

use crate::error::Result;

use super::field::ForeignKeyField;
use super::meta::ModelMetaBuilder;

/// Describes one side of a many-to-many relationship for
/// [`through_model`] — the field name installed on the through model and
/// the model it references.
#[derive(Debug, Clone)]
pub struct ManyToManySide {
    pub field_name: CompactString,
    pub target_model: CompactString,
    pub backref: Option<CompactString>,
}

impl ManyToManySide {
    pub fn new(field_name: impl Into<CompactString>, target_model: impl Into<CompactString>) -> Self {
        ManyToManySide { field_name: field_name.into(), target_model: target_model.into(), backref: None }
    }

    pub fn backref(mut self, name: impl Into<CompactString>) -> Self {
        self.backref = Some(name.into());
        self
    }
}

/// Adds both sides' foreign keys plus a composite unique index to a
/// through-model builder (peewee: the dynamically generated through
/// model's `ManyToManyField.get_through_model()`).
///
/// Callers build the through model the same way as any other model —
/// `ModelMeta::builder("UserGroup")` — and pass it through this function
/// before `.build()`.
pub fn through_model(mut builder: ModelMetaBuilder, left: ManyToManySide, right: ManyToManySide) -> Result<ModelMetaBuilder> {
    let left_column = compact_str::format_compact!("{}_id", left.field_name);
    let right_column = compact_str::format_compact!("{}_id", right.field_name);

    let mut left_fk = ForeignKeyField::new(left.field_name.clone(), left.target_model.clone());
    left_fk.column = left_fk.column.column(left_column.clone());
    if let Some(backref) = left.backref {
        left_fk = left_fk.backref(backref);
    }
    builder = builder.foreign_key(Rc::new(left_fk))?;

    let mut right_fk = ForeignKeyField::new(right.field_name.clone(), right.target_model.clone());
    right_fk.column = right_fk.column.column(right_column.clone());
    if let Some(backref) = right.backref {
        right_fk = right_fk.backref(backref);
    }
    builder = builder.foreign_key(Rc::new(right_fk))?;

    Ok(builder.index(vec![left_column, right_column], true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::meta::ModelMeta;

    #[test]
    fn through_model_installs_both_foreign_keys_and_a_composite_unique_index() {
        let builder = ModelMeta::builder("UserGroup");
        let builder = through_model(
            builder,
            ManyToManySide::new("user", "User"),
            ManyToManySide::new("group", "Group"),
        )
        .unwrap();
        let meta = builder.build();

        assert_eq!(meta.refs.get("user").unwrap().as_str(), "User");
        assert_eq!(meta.refs.get("group").unwrap().as_str(), "Group");
        assert_eq!(meta.indexes.len(), 1);
        assert!(meta.indexes[0].unique);
        assert_eq!(meta.indexes[0].columns, vec![CompactString::from("user_id"), CompactString::from("group_id")]);
    }
}
