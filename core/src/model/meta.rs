//! Per-model metadata assembly (§3 "Model Metadata"). The source's
//! metaclass-at-class-construction-time assembly maps to an explicit
//! builder (§9): `ModelMeta::builder(name).field(..).primary_key(..)...`.

use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use crate::error::{QuarryError, Result};

use super::field::{DeferredForeignKey, Field, ForeignKeyField};

/// A model's primary key shape (§3).
#[derive(Debug, Clone)]
pub enum PrimaryKey {
    Single(CompactString),
    Composite(Vec<CompactString>),
    /// Explicitly disabled — no implicit `AutoField` id, no WHERE-by-id
    /// helpers.
    None,
}

/// An explicit or implicit index declaration (§4.9, §6).
#[derive(Debug, Clone)]
pub struct ModelIndex {
    pub columns: Vec<CompactString>,
    pub unique: bool,
}

/// Assembled metadata for one record type (§3). `fields`/`columns` are
/// insertion-ordered (`IndexMap`) because `_sort_key`'s tie-break is
/// declaration order, which a `HashMap` cannot preserve.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    pub name: CompactString,
    pub table_name: CompactString,
    pub schema: Option<CompactString>,
    pub table_alias: Option<CompactString>,

    pub fields: IndexMap<CompactString, Rc<dyn Field>>,
    pub columns: IndexMap<CompactString, Rc<dyn Field>>,

    pub primary_key: PrimaryKey,

    /// Field name -> target model name, for every `ForeignKeyField`.
    pub refs: IndexMap<CompactString, CompactString>,
    /// Field name -> owner model name, populated on the TARGET model when
    /// some other model's FK points at it.
    pub backrefs: IndexMap<CompactString, CompactString>,
    /// Inverted index: target model name -> field names on THIS model
    /// that reference it.
    pub model_refs: IndexMap<CompactString, Vec<CompactString>>,
    /// Inverted index: owner model name -> field names on the OWNER that
    /// point at THIS model.
    pub model_backrefs: IndexMap<CompactString, Vec<CompactString>>,

    pub indexes: Vec<ModelIndex>,
    pub depends_on: Vec<CompactString>,
    pub only_save_dirty: bool,
    pub without_rowid: bool,
    pub constraints: Vec<CompactString>,
    pub options: IndexMap<CompactString, CompactString>,

    /// FKs named by string whose target model isn't registered yet;
    /// drained by the registry as matching models appear (§3, §9).
    pub pending_deferred: Vec<DeferredForeignKey>,
}

impl ModelMeta {
    /// Installs a resolved deferred FK, wiring this side's
    /// `fields`/`columns`/`refs`/`model_refs` exactly as
    /// [`ModelMetaBuilder::foreign_key`] does for a non-deferred one.
    pub(crate) fn install_resolved_fk(&mut self, fk: Rc<ForeignKeyField>) {
        let name = fk.name().clone();
        self.refs.insert(name.clone(), fk.target_model.clone());
        self.model_refs
            .entry(fk.target_model.clone())
            .or_default()
            .push(name.clone());
        self.fields.insert(name, fk.clone() as Rc<dyn Field>);
        self.columns
            .insert(fk.column_name().clone(), fk as Rc<dyn Field>);
    }

    /// Installs the reverse side of a resolved FK onto its target model
    /// (§3 `backrefs`/`model_backrefs`).
    pub(crate) fn install_backref(&mut self, owner_model: CompactString, field_name: CompactString) {
        let backref_name = field_name.clone();
        self.backrefs.insert(backref_name, owner_model.clone());
        self.model_backrefs
            .entry(owner_model)
            .or_default()
            .push(field_name);
    }
}

impl ModelMeta {
    pub fn builder(name: impl Into<CompactString>) -> ModelMetaBuilder {
        let name = name.into();
        ModelMetaBuilder {
            table_name: pluralize_lower(&name),
            meta: ModelMeta {
                name,
                table_name: CompactString::default(),
                schema: None,
                table_alias: None,
                fields: IndexMap::new(),
                columns: IndexMap::new(),
                primary_key: PrimaryKey::None,
                refs: IndexMap::new(),
                backrefs: IndexMap::new(),
                model_refs: IndexMap::new(),
                model_backrefs: IndexMap::new(),
                indexes: Vec::new(),
                depends_on: Vec::new(),
                only_save_dirty: false,
                without_rowid: false,
                constraints: Vec::new(),
                options: IndexMap::new(),
                pending_deferred: Vec::new(),
            },
        }
    }

    /// Stable order: primary key first, then declaration order (§3
    /// `sorted_fields`).
    pub fn sorted_fields(&self) -> Vec<&Rc<dyn Field>> {
        let mut fields: Vec<&Rc<dyn Field>> = self.fields.values().collect();
        fields.sort_by_key(|f| f.sort_key());
        fields
    }

    pub fn field(&self, name: &str) -> Option<&Rc<dyn Field>> {
        self.fields.get(name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Rc<dyn Field>> {
        self.columns.get(column)
    }

    pub fn primary_key_field_names(&self) -> Vec<CompactString> {
        match &self.primary_key {
            PrimaryKey::Single(name) => vec![name.clone()],
            PrimaryKey::Composite(names) => names.clone(),
            PrimaryKey::None => Vec::new(),
        }
    }
}

fn pluralize_lower(name: &str) -> CompactString {
    name.to_lowercase().into()
}

pub struct ModelMetaBuilder {
    meta: ModelMeta,
    table_name: CompactString,
}

impl ModelMetaBuilder {
    pub fn table_name(mut self, table_name: impl Into<CompactString>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn schema(mut self, schema: impl Into<CompactString>) -> Self {
        self.meta.schema = Some(schema.into());
        self
    }

    pub fn field(mut self, field: Rc<dyn Field>) -> Result<Self> {
        let name = field.name().clone();
        let column = field.column_name().clone();
        if field.primary_key() {
            match &self.meta.primary_key {
                PrimaryKey::None => self.meta.primary_key = PrimaryKey::Single(name.clone()),
                _ => {
                    return Err(QuarryError::ImproperlyConfigured(
                        format!("model `{}` declares more than one primary key field", self.meta.name).into(),
                    ))
                }
            }
        }
        self.meta.fields.insert(name, field.clone());
        self.meta.columns.insert(column, field);
        Ok(self)
    }

    /// Registers a `ForeignKeyField`, wiring `refs`/`model_refs` on this
    /// side; the registry wires the target's `backrefs`/`model_backrefs`
    /// once both models are known (§3, §9).
    pub fn foreign_key(mut self, fk: Rc<ForeignKeyField>) -> Result<Self> {
        let name = fk.name().clone();
        self.meta.refs.insert(name.clone(), fk.target_model.clone());
        self.meta
            .model_refs
            .entry(fk.target_model.clone())
            .or_default()
            .push(name);
        self.field(fk as Rc<dyn Field>)
    }

    /// Registers a FK whose target model may not exist yet (§6
    /// `DeferredForeignKey("TargetName")`); the registry resolves it once
    /// a matching model is registered (§3, §9).
    pub fn deferred_foreign_key(mut self, deferred: DeferredForeignKey) -> Self {
        self.meta.pending_deferred.push(deferred);
        self
    }

    pub fn composite_key(mut self, names: Vec<CompactString>) -> Self {
        self.meta.primary_key = PrimaryKey::Composite(names);
        self
    }

    pub fn no_primary_key(mut self) -> Self {
        self.meta.primary_key = PrimaryKey::None;
        self
    }

    pub fn index(mut self, columns: Vec<CompactString>, unique: bool) -> Self {
        self.meta.indexes.push(ModelIndex { columns, unique });
        self
    }

    pub fn depends_on(mut self, model_name: impl Into<CompactString>) -> Self {
        self.meta.depends_on.push(model_name.into());
        self
    }

    pub fn only_save_dirty(mut self) -> Self {
        self.meta.only_save_dirty = true;
        self
    }

    pub fn without_rowid(mut self) -> Self {
        self.meta.without_rowid = true;
        self
    }

    pub fn constraint(mut self, sql: impl Into<CompactString>) -> Self {
        self.meta.constraints.push(sql.into());
        self
    }

    pub fn option(mut self, key: impl Into<CompactString>, value: impl Into<CompactString>) -> Self {
        self.meta.options.insert(key.into(), value.into());
        self
    }

    pub fn build(mut self) -> ModelMeta {
        if self.meta.table_name.is_empty() {
            self.meta.table_name = self.table_name;
        }
        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{FieldKind, ScalarField};

    #[test]
    fn primary_key_sorts_before_other_fields_regardless_of_declaration_order() {
        let id = Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key());
        let name = Rc::new(ScalarField::new("name", FieldKind::Text));
        // Declared name first, id second — sort must still put id first.
        let meta = ModelMeta::builder("user")
            .field(name)
            .unwrap()
            .field(id)
            .unwrap()
            .build();
        let sorted = meta.sorted_fields();
        assert_eq!(sorted[0].name().as_str(), "id");
        assert_eq!(sorted[1].name().as_str(), "name");
    }

    #[test]
    fn second_primary_key_field_is_a_hard_error() {
        let id1 = Rc::new(ScalarField::new("id", FieldKind::AutoField).primary_key());
        let id2 = Rc::new(ScalarField::new("uuid", FieldKind::Uuid).primary_key());
        let result = ModelMeta::builder("user").field(id1).unwrap().field(id2);
        assert!(result.is_err());
    }
}
