//! The query AST (§3). Nodes are value-like; "mutating" builder methods
//! (see [`crate::builder`]) return clones rather than mutating in place.

mod case;
mod column;
mod entity;
mod expression;
mod function;
mod join;
mod misc;
mod node_list;
mod ordering;
mod param;
mod select;
mod window;

pub use case::Case;
pub use column::Column;
pub use entity::{next_source_id, Cte, Entity, Table};
pub use expression::Expression;
pub use function::Function;
pub use join::{Join, JoinType};
pub use misc::{Alias, Cast, Check, Negated, Sql};
pub use node_list::NodeList;
pub use ordering::{Nulls, Ordering, OrderingDirection};
pub use param::Param;
pub use select::{CompoundOp, CompoundSelect, Select};
pub use window::{Frame, FrameBound, FrameUnit, Window};

use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;
use crate::render::Render;
use crate::value::Value;

/// The closed set of AST node variants (§3, §9: "a visitor pattern on
/// Context for AST rendering, with a closed set of node variants rather
/// than open-ended method dispatch").
#[derive(Debug, Clone)]
pub enum Node {
    Entity(Entity),
    Table(Rc<Table>),
    Cte(Rc<Cte>),
    Column(Column),
    Param(Param),
    Expression(Box<Expression>),
    NodeList(NodeList),
    Function(Function),
    Window(Box<Window>),
    Ordering(Box<Ordering>),
    Alias(Box<Alias>),
    Cast(Box<Cast>),
    Negated(Box<Negated>),
    Check(Box<Check>),
    Sql(Sql),
    Join(Box<Join>),
    Select(Box<Select>),
    CompoundSelect(Box<CompoundSelect>),
    Case(Box<Case>),
}

impl Render for Node {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        match self {
            Node::Entity(n) => n.render(ctx),
            Node::Table(n) => n.render(ctx),
            Node::Cte(n) => n.render(ctx),
            Node::Column(n) => n.render(ctx),
            Node::Param(n) => n.render(ctx),
            Node::Expression(n) => n.render(ctx),
            Node::NodeList(n) => n.render(ctx),
            Node::Function(n) => n.render(ctx),
            Node::Window(n) => n.render(ctx),
            Node::Ordering(n) => n.render(ctx),
            Node::Alias(n) => n.render(ctx),
            Node::Cast(n) => n.render(ctx),
            Node::Negated(n) => n.render(ctx),
            Node::Check(n) => n.render(ctx),
            Node::Sql(n) => n.render(ctx),
            Node::Join(n) => n.render(ctx),
            Node::Select(n) => n.render(ctx),
            Node::CompoundSelect(n) => n.render(ctx),
            Node::Case(n) => n.render(ctx),
        }
    }
}

impl Node {
    /// Wraps a scalar in a [`Param`] node, as `Context::sql` does implicitly
    /// for anything that isn't already a `Node` (§4.1 `sql(node)`).
    pub fn value(v: impl Into<Value>) -> Node {
        Node::Param(Param::new(v.into()))
    }

    pub fn raw(sql: impl Into<String>) -> Node {
        Node::Sql(Sql::new(sql.into(), Vec::new()))
    }

    /// True if this node, rendered bare, already parenthesizes itself —
    /// used by `NodeList::render` to avoid double-wrapping (§4.2).
    pub fn self_parenthesizes(&self) -> bool {
        matches!(self, Node::Expression(_) | Node::Select(_) | Node::CompoundSelect(_))
    }

    /// Marks an `Expression` node `flat` (suppressing its own parens) — used
    /// when an enclosing `NodeList(parens=true)` already supplies them.
    pub fn flatten(self) -> Node {
        match self {
            Node::Expression(mut e) => {
                e.flat = true;
                Node::Expression(e)
            }
            other => other,
        }
    }
}

impl From<Value> for Node {
    fn from(v: Value) -> Self {
        Node::Param(Param::new(v))
    }
}
