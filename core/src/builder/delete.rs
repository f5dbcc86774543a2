use std::rc::Rc;

use super::Statement;
use crate::ast::{Node, Table};
use crate::context::{Context, Scope};
use crate::error::Result;

/// `DELETE FROM t [WHERE ...] [RETURNING ...]`, rendered under
/// `Scope::Values` (§4.4).
#[derive(Debug, Clone)]
pub struct DeleteQuery {
    table: Rc<Table>,
    where_clause: Option<Node>,
    returning: Vec<Node>,
}

impl DeleteQuery {
    pub fn new(table: Rc<Table>) -> Self {
        DeleteQuery {
            table,
            where_clause: None,
            returning: Vec::new(),
        }
    }

    pub fn where_(mut self, predicate: Node) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Node::Expression(Box::new(crate::ast::Expression::new(
                existing, "AND", predicate,
            ))),
            None => predicate,
        });
        self
    }

    pub fn returning(mut self, projection: Vec<Node>) -> Self {
        self.returning = projection;
        self
    }
}

impl Statement for DeleteQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("DELETE FROM ");
        ctx.with_scope(Scope::Values, false, false, |ctx| self.table.render(ctx))?;
        if let Some(where_clause) = &self.where_clause {
            ctx.literal(" WHERE ");
            where_clause.render(ctx)?;
        }
        if ctx.dialect().supports_returning() && !self.returning.is_empty() {
            ctx.literal(" RETURNING ");
            for (i, node) in self.returning.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                node.render(ctx)?;
            }
        }
        Ok(())
    }
}
