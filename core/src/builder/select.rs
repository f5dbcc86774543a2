use compact_str::CompactString;

use super::Statement;
use crate::ast::{CompoundOp, Node, Ordering, Select, Window};
use crate::context::Context;
use crate::error::Result;

/// Fluent builder over [`Select`]. Every method consumes `self` and returns
/// a new value (§3 "value objects... copy-on-write"); the underlying AST
/// node is only assembled, never rendered, until [`Statement::render`].
#[derive(Debug, Clone)]
pub struct SelectQuery {
    inner: Select,
}

impl SelectQuery {
    pub fn new() -> Self {
        SelectQuery { inner: Select::new() }
    }

    pub fn from(mut self, source: Node) -> Self {
        self.inner.from = Some(source);
        self
    }

    pub fn columns(mut self, projection: Vec<Node>) -> Self {
        self.inner.projection = projection;
        self
    }

    pub fn with(mut self, cte: std::rc::Rc<crate::ast::Cte>) -> Self {
        self.inner.with.push(cte);
        self
    }

    pub fn recursive(mut self) -> Self {
        self.inner.recursive = true;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.inner.distinct = true;
        self
    }

    pub fn distinct_on(mut self, cols: Vec<Node>) -> Self {
        self.inner.distinct_on = cols;
        self
    }

    pub fn where_(mut self, predicate: Node) -> Self {
        self.inner.where_clause = Some(match self.inner.where_clause.take() {
            Some(existing) => Node::Expression(Box::new(crate::ast::Expression::new(
                existing, "AND", predicate,
            ))),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, cols: Vec<Node>) -> Self {
        self.inner.group_by = cols;
        self
    }

    pub fn having(mut self, predicate: Node) -> Self {
        self.inner.having = Some(predicate);
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.inner.windows.push(window);
        self
    }

    pub fn order_by(mut self, orderings: Vec<Ordering>) -> Self {
        self.inner.order_by = orderings;
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.inner.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.inner.offset = Some(n);
        self
    }

    /// `FOR UPDATE[ mode]`; `mode` is e.g. `"NOWAIT"` or `"SKIP LOCKED"`.
    /// Rejected at render time if the dialect doesn't support it (§4.3).
    pub fn for_update(mut self, mode: impl Into<CompactString>) -> Self {
        self.inner.for_update = Some(mode.into());
        self
    }

    pub fn union(self, other: SelectQuery) -> super::CompoundQuery {
        super::CompoundQuery::new(self.into_node(), CompoundOp::Union, other.into_node())
    }

    pub fn union_all(self, other: SelectQuery) -> super::CompoundQuery {
        super::CompoundQuery::new(self.into_node(), CompoundOp::UnionAll, other.into_node())
    }

    pub fn intersect(self, other: SelectQuery) -> super::CompoundQuery {
        super::CompoundQuery::new(self.into_node(), CompoundOp::Intersect, other.into_node())
    }

    pub fn except(self, other: SelectQuery) -> super::CompoundQuery {
        super::CompoundQuery::new(self.into_node(), CompoundOp::Except, other.into_node())
    }

    /// Source id of the underlying `Select`, stable across clones — used by
    /// callers that embed this query as a FROM source or CTE body.
    pub fn source_id(&self) -> crate::alias::SourceId {
        self.inner.id
    }

    pub fn into_select(self) -> Select {
        self.inner
    }

    pub(crate) fn into_node(self) -> Node {
        Node::Select(Box::new(self.inner))
    }
}

impl Default for SelectQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Statement for SelectQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        self.inner.render_body(ctx)
    }
}

