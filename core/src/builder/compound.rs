use super::Statement;
use crate::ast::{CompoundOp, CompoundSelect, Node, Ordering};
use crate::context::Context;
use crate::error::Result;

/// `lhs <op> rhs`, built by chaining `SelectQuery::union`/`intersect`/etc.
/// Its own ORDER BY/LIMIT/OFFSET bind to the compound as a whole (§4.3, §8
/// scenario: `(S1 UNION S2) ORDER BY x LIMIT k`).
#[derive(Debug, Clone)]
pub struct CompoundQuery {
    inner: CompoundSelect,
}

impl CompoundQuery {
    pub(crate) fn new(lhs: Node, op: CompoundOp, rhs: Node) -> Self {
        CompoundQuery {
            inner: CompoundSelect::new(lhs, op, rhs),
        }
    }

    pub fn union(self, other: super::SelectQuery) -> Self {
        CompoundQuery::new(self.into_node(), CompoundOp::Union, other.into_node())
    }

    pub fn union_all(self, other: super::SelectQuery) -> Self {
        CompoundQuery::new(self.into_node(), CompoundOp::UnionAll, other.into_node())
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

    pub fn source_id(&self) -> crate::alias::SourceId {
        self.inner.id
    }

    fn into_node(self) -> Node {
        Node::CompoundSelect(Box::new(self.inner))
    }
}

impl Statement for CompoundQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        self.inner.render_body(ctx)
    }
}
