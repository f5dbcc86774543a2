//! Quarry: an embeddable relational-database toolkit — a composable SQL
//! AST/generator and a model/metadata layer over SQLite, PostgreSQL and
//! MySQL (§1).
//!
//! This crate is a thin re-export shell over [`quarry_core`] plus whichever
//! dialect crates are enabled by feature flag; the actual AST, builder,
//! model and prefetch machinery all live in `quarry-core`.

pub use quarry_core::*;

#[cfg(feature = "sqlite")]
pub use quarry_sqlite::SqliteDialect;

#[cfg(feature = "postgres")]
pub use quarry_postgres::PostgresDialect;

#[cfg(feature = "mysql")]
pub use quarry_mysql::MysqlDialect;

/// Brings the common builder/model/dialect surface into scope with one
/// `use quarry::prelude::*;` (§1).
pub mod prelude {
    pub use quarry_core::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use quarry_sqlite::SqliteDialect;

    #[cfg(feature = "postgres")]
    pub use quarry_postgres::PostgresDialect;

    #[cfg(feature = "mysql")]
    pub use quarry_mysql::MysqlDialect;
}
