use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use super::Statement;
use crate::ast::{Entity, Node, Table};
use crate::context::{Context, Scope};
use crate::error::Result;

/// `UPDATE t SET col = val, ... [WHERE ...] [RETURNING ...]`, rendered
/// under `Scope::Values` so the table and columns print unqualified (§4.4).
#[derive(Debug, Clone)]
pub struct UpdateQuery {
    table: Rc<Table>,
    assignments: IndexMap<CompactString, Node>,
    where_clause: Option<Node>,
    returning: Vec<Node>,
}

impl UpdateQuery {
    pub fn new(table: Rc<Table>, assignments: IndexMap<CompactString, Node>) -> Self {
        UpdateQuery {
            table,
            assignments,
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

impl Statement for UpdateQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("UPDATE ");
        ctx.with_scope(Scope::Values, false, false, |ctx| self.table.render(ctx))?;
        ctx.literal(" SET ");
        for (i, (col, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                ctx.literal(", ");
            }
            Entity::single(col.clone()).render(ctx)?;
            ctx.literal(" = ");
            value.render(ctx)?;
        }
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
