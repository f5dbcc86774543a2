//! Query builders (§4.3, §4.4). Each builder is an immutable-chain value
//! type — "mutating" methods consume `self` and return a new `Self`, as the
//! AST nodes underneath them do (§3).

mod compound;
mod delete;
mod insert;
mod raw;
mod select;
mod update;

pub use compound::CompoundQuery;
pub use delete::DeleteQuery;
pub use insert::{InsertData, InsertQuery};
pub use raw::RawQuery;
pub use select::SelectQuery;
pub use update::UpdateQuery;

use crate::context::Context;
use crate::error::Result;
use crate::value::Value;

/// Common entry point: render into a fresh `Context` for `dialect` and
/// return the final `(sql, params)` pair.
pub trait Statement {
    fn render(&self, ctx: &mut Context) -> Result<()>;

    fn to_sql(&self, dialect: std::rc::Rc<dyn crate::dialect::Dialect>) -> Result<(String, Vec<Value>)> {
        let mut ctx = Context::new(dialect);
        self.render(&mut ctx)?;
        Ok(ctx.query())
    }
}
