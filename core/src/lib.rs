//! Core AST, SQL generator, model metadata and prefetch engine (§1-§9).
//!
//! A concrete dialect (`quarry-sqlite`, `quarry-postgres`, `quarry-mysql`)
//! plugs into this crate through [`dialect::Dialect`] and [`driver::Driver`];
//! nothing here talks to a wire protocol directly (§1 "out of scope").

pub mod alias;
pub mod ast;
pub mod builder;
pub mod context;
pub mod cursor;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod model;
pub mod prefetch;
pub mod render;
pub mod schema_manager;
pub mod tracing;
pub mod transaction;
pub mod value;

/// Re-exports of the types most callers need, mirroring this crate's own
/// `use` lists (§1).
pub mod prelude {
    pub use crate::ast::{Column, Node, Table};
    pub use crate::builder::{
        CompoundQuery, DeleteQuery, InsertQuery, RawQuery, SelectQuery, Statement, UpdateQuery,
    };
    pub use crate::context::Context;
    pub use crate::dialect::{ConflictAction, Dialect, DialectKind, OnConflict};
    pub use crate::driver::{ConnectOptions, Connection, Driver};
    pub use crate::error::{QuarryError, Result};
    pub use crate::model::{
        bulk_create, get_or_create, Field, ForeignKeyField, Instance, ManyToManySide, Model, ModelMeta, ModelMetaBuilder,
        ScalarField, SharedMeta, through_model,
    };
    pub use crate::prefetch::{prefetch, PrefetchQuery};
    pub use crate::schema_manager::{create_tables, drop_tables, SchemaManager};
    pub use crate::transaction::{Database, Frame, FrameAction, TransactionManager};
    pub use crate::value::Value;
}
