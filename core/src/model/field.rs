//! Field declarations: per-field coercion (db <-> memory), sort order, DDL
//! emission (§6 "Record definition surface").

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use compact_str::CompactString;

use crate::value::{Converter, Value};

static DECLARATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Assigns a globally increasing declaration index, the basis of
/// `_sort_key = (0 if primary_key else 1, declaration_order)` (§3, §9:
/// "fields carry a global insertion-order counter").
pub fn next_declaration_order() -> u64 {
    DECLARATION_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Timestamp tick resolution (§6): 1 = seconds, 10^6 = microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampResolution(pub u64);

impl TimestampResolution {
    pub const SECONDS: TimestampResolution = TimestampResolution(1);
    pub const MICROSECONDS: TimestampResolution = TimestampResolution(1_000_000);
}

/// Decimal rounding mode, mirroring the source's `Decimal(rounding=...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    HalfUp,
    HalfEven,
    Down,
}

/// The declared scalar field types (§6). Field sugar beyond what
/// influences SQL generation (exact parsing formats) is illustrative, not
/// normative, per §1.
#[derive(Debug, Clone)]
pub enum FieldKind {
    AutoField,
    Integer,
    BigInteger,
    Float,
    Double,
    Decimal {
        max_digits: u32,
        decimal_places: u32,
        auto_round: bool,
        rounding: Rounding,
    },
    Char {
        max_length: u32,
    },
    FixedChar {
        max_length: u32,
    },
    Text,
    Blob,
    Bool,
    Uuid,
    Date,
    DateTime,
    Time,
    Timestamp {
        resolution: TimestampResolution,
        utc: bool,
    },
    /// 4-byte packed IPv4 address, external format a big-endian integer
    /// (§6).
    Ip,
    /// Untyped passthrough column.
    Bare,
}

impl FieldKind {
    /// Name fed to `Dialect::field_type` for DDL column-type mapping
    /// (§4.5, §4.9).
    pub fn semantic_name(&self) -> &'static str {
        match self {
            FieldKind::AutoField => "auto",
            FieldKind::Integer => "integer",
            FieldKind::BigInteger => "biginteger",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Decimal { .. } => "decimal",
            FieldKind::Char { .. } => "char",
            FieldKind::FixedChar { .. } => "fixedchar",
            FieldKind::Text => "text",
            FieldKind::Blob => "blob",
            FieldKind::Bool => "bool",
            FieldKind::Uuid => "uuid",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Time => "time",
            FieldKind::Timestamp { .. } => "timestamp",
            FieldKind::Ip => "ip",
            FieldKind::Bare => "bare",
        }
    }

    /// `db_value`: in-memory representation -> wire representation. Exact
    /// Timestamp/IP/Decimal encoding is illustrative per §1 ("field sugar
    /// beyond what influences SQL generation... is illustrative, not
    /// normative"); every kind here passes values through unchanged, which
    /// is already correct for the kinds (Integer, Text, Blob, ...) that
    /// store their in-memory representation directly on the wire.
    fn db_value(&self, value: &Value) -> Value {
        value.clone()
    }

    /// `python_value`: wire representation -> in-memory representation.
    /// Named to match §4.7's materializer algorithm, which calls it that.
    fn python_value(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// Per-field metadata and behavior (§3, §6). Implementors are held behind
/// `Rc<dyn Field>` so a model's metadata and a query's projection can
/// share one instance.
pub trait Field: std::fmt::Debug {
    fn name(&self) -> &CompactString;
    fn column_name(&self) -> &CompactString;
    fn primary_key(&self) -> bool;
    fn null(&self) -> bool;
    fn unique(&self) -> bool;
    fn index(&self) -> bool;
    fn semantic_type(&self) -> &'static str;
    fn declaration_order(&self) -> u64;

    /// `(0, order)` for the primary key, `(1, order)` otherwise — total
    /// order is globally increasing and primary-key-first (§3).
    fn sort_key(&self) -> (u8, u64) {
        (if self.primary_key() { 0 } else { 1 }, self.declaration_order())
    }

    fn db_value(&self, value: &Value) -> Value;
    fn python_value(&self, value: &Value) -> Value;

    /// A scalar default applied at instantiation from a copy, distinct
    /// from a callable default invoked per instance (§3).
    fn scalar_default(&self) -> Option<Value> {
        None
    }

    /// `ON DELETE`/`ON UPDATE`, for the schema manager's inline FK
    /// constraint emission (§4.9). `None` for every scalar field.
    fn on_delete(&self) -> Option<ReferentialAction> {
        None
    }

    fn on_update(&self) -> Option<ReferentialAction> {
        None
    }

    /// Explicit target column name for a foreign key, `None` to mean "the
    /// target's primary key" (§6 `to_field`). `None` for every scalar field.
    fn to_field(&self) -> Option<&CompactString> {
        None
    }

    /// Name of a database sequence backing this column's default, e.g.
    /// `"foo_id_seq"` (§4.9 `DEFAULT NEXTVAL('seq')`). Only consulted when
    /// the dialect reports `Dialect::supports_sequences`.
    fn sequence(&self) -> Option<&CompactString> {
        None
    }
}

/// Wraps a `Rc<dyn Field>` as a [`Converter`] so `Context`'s converter
/// stack can drive RHS parameter conversion without depending on the
/// model layer directly (§4.2 "converter injection").
#[derive(Debug, Clone)]
pub struct FieldConverter(pub Rc<dyn Field>);

impl Converter for FieldConverter {
    fn db_value(&self, value: &Value) -> Value {
        self.0.db_value(value)
    }
}

/// A plain scalar column (everything except `ForeignKey`/`CompositeKey`).
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub name: CompactString,
    pub column_name: CompactString,
    pub kind: FieldKind,
    pub null: bool,
    pub unique: bool,
    pub index: bool,
    pub primary_key: bool,
    pub default: Option<Value>,
    pub declaration_order: u64,
    /// Backing sequence name, e.g. for an explicit `AutoField` sequence on
    /// a dialect that supports them (§4.9).
    pub sequence: Option<CompactString>,
}

impl ScalarField {
    pub fn new(name: impl Into<CompactString>, kind: FieldKind) -> Self {
        let name = name.into();
        ScalarField {
            column_name: name.clone(),
            name,
            kind,
            null: false,
            unique: false,
            index: false,
            primary_key: false,
            default: None,
            declaration_order: next_declaration_order(),
            sequence: None,
        }
    }

    pub fn column(mut self, column_name: impl Into<CompactString>) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn null(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn sequence(mut self, name: impl Into<CompactString>) -> Self {
        self.sequence = Some(name.into());
        self
    }
}

impl Field for ScalarField {
    fn name(&self) -> &CompactString {
        &self.name
    }
    fn column_name(&self) -> &CompactString {
        &self.column_name
    }
    fn primary_key(&self) -> bool {
        self.primary_key
    }
    fn null(&self) -> bool {
        self.null
    }
    fn unique(&self) -> bool {
        self.unique
    }
    fn index(&self) -> bool {
        self.index
    }
    fn semantic_type(&self) -> &'static str {
        self.kind.semantic_name()
    }
    fn declaration_order(&self) -> u64 {
        self.declaration_order
    }
    fn db_value(&self, value: &Value) -> Value {
        self.kind.db_value(value)
    }
    fn python_value(&self, value: &Value) -> Value {
        self.kind.python_value(value)
    }
    fn scalar_default(&self) -> Option<Value> {
        self.default.clone()
    }
    fn sequence(&self) -> Option<&CompactString> {
        self.sequence.as_ref()
    }
}

/// `ON DELETE`/`ON UPDATE` referential actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

/// A foreign-key column: an integer (by default) column plus the
/// target-model relationship metadata the registry wires into
/// `refs`/`backrefs` (§3, §6).
#[derive(Debug, Clone)]
pub struct ForeignKeyField {
    pub column: ScalarField,
    /// Target model name, as declared (case preserved; matched
    /// case-insensitively when resolving deferred references, §3).
    pub target_model: CompactString,
    /// Target field name; `None` means the target's primary key.
    pub to_field: Option<CompactString>,
    /// Attribute name installed on the target model for the backref
    /// query; defaults to this model's lowercased name (§4.7).
    pub backref: Option<CompactString>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
    /// Name of the raw id accessor, defaults to `{name}_id` (§6
    /// `object_id_name`).
    pub object_id_name: Option<CompactString>,
}

impl ForeignKeyField {
    pub fn new(name: impl Into<CompactString>, target_model: impl Into<CompactString>) -> Self {
        ForeignKeyField {
            column: ScalarField::new(name, FieldKind::Integer),
            target_model: target_model.into(),
            to_field: None,
            backref: None,
            on_delete: None,
            on_update: None,
            object_id_name: None,
        }
    }

    pub fn to_field(mut self, field: impl Into<CompactString>) -> Self {
        self.to_field = Some(field.into());
        self
    }

    pub fn backref(mut self, name: impl Into<CompactString>) -> Self {
        self.backref = Some(name.into());
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn null(mut self) -> Self {
        self.column = self.column.null();
        self
    }

    pub fn object_id_name(&self) -> CompactString {
        self.object_id_name
            .clone()
            .unwrap_or_else(|| compact_str::format_compact!("{}_id", self.column.name))
    }
}

impl Field for ForeignKeyField {
    fn name(&self) -> &CompactString {
        self.column.name()
    }
    fn column_name(&self) -> &CompactString {
        self.column.column_name()
    }
    fn primary_key(&self) -> bool {
        self.column.primary_key()
    }
    fn null(&self) -> bool {
        self.column.null()
    }
    fn unique(&self) -> bool {
        self.column.unique()
    }
    fn index(&self) -> bool {
        self.column.index()
    }
    fn semantic_type(&self) -> &'static str {
        self.column.semantic_type()
    }
    fn declaration_order(&self) -> u64 {
        self.column.declaration_order()
    }
    fn db_value(&self, value: &Value) -> Value {
        self.column.db_value(value)
    }
    fn python_value(&self, value: &Value) -> Value {
        self.column.python_value(value)
    }
    fn scalar_default(&self) -> Option<Value> {
        self.column.scalar_default()
    }
    fn on_delete(&self) -> Option<ReferentialAction> {
        self.on_delete
    }
    fn on_update(&self) -> Option<ReferentialAction> {
        self.on_update
    }
    fn to_field(&self) -> Option<&CompactString> {
        self.to_field.as_ref()
    }
    fn sequence(&self) -> Option<&CompactString> {
        self.column.sequence()
    }
}

/// A foreign key whose target model isn't defined yet, named by string
/// (§6 `DeferredForeignKey("TargetName")`). Resolved by the registry once
/// a model with that name registers (§3, §9).
#[derive(Debug, Clone)]
pub struct DeferredForeignKey {
    pub name: CompactString,
    pub target_model_name: CompactString,
    pub to_field: Option<CompactString>,
    pub backref: Option<CompactString>,
}

impl DeferredForeignKey {
    pub fn new(name: impl Into<CompactString>, target_model_name: impl Into<CompactString>) -> Self {
        DeferredForeignKey {
            name: name.into(),
            target_model_name: target_model_name.into(),
            to_field: None,
            backref: None,
        }
    }

    pub fn resolve(self) -> ForeignKeyField {
        let mut fk = ForeignKeyField::new(self.name, self.target_model_name);
        if let Some(to_field) = self.to_field {
            fk = fk.to_field(to_field);
        }
        if let Some(backref) = self.backref {
            fk = fk.backref(backref);
        }
        fk
    }
}
