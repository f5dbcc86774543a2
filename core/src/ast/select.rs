use std::rc::Rc;

use compact_str::CompactString;

use super::{Cte, Node, Ordering, Window};
use crate::alias::SourceId;
use crate::context::{Context, Scope};
use crate::error::{QuarryError, Result};
use crate::render::Render;

/// A `SELECT` statement. Also usable as a FROM source, a scalar/correlated
/// subquery, or a CTE body (§3, §4.3).
#[derive(Debug, Clone)]
pub struct Select {
    pub id: SourceId,
    pub with: Vec<Rc<Cte>>,
    pub recursive: bool,
    pub distinct: bool,
    pub distinct_on: Vec<Node>,
    pub projection: Vec<Node>,
    pub from: Option<Node>,
    pub where_clause: Option<Node>,
    pub group_by: Vec<Node>,
    pub having: Option<Node>,
    pub windows: Vec<Window>,
    pub order_by: Vec<Ordering>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub for_update: Option<CompactString>,
}

impl Default for Select {
    fn default() -> Self {
        Select {
            id: super::entity::next_source_id(),
            with: Vec::new(),
            recursive: false,
            distinct: false,
            distinct_on: Vec::new(),
            projection: Vec::new(),
            from: None,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            windows: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            for_update: None,
        }
    }
}

impl Select {
    pub fn new() -> Self {
        Select::default()
    }

    /// Renders the statement body with no surrounding parentheses — used by
    /// top-level execution and by `Cte`/`CompoundSelect`, which supply their
    /// own wrapping.
    pub fn render_body(&self, ctx: &mut Context) -> Result<()> {
        if !self.with.is_empty() {
            ctx.literal("WITH ");
            if self.recursive {
                ctx.literal("RECURSIVE ");
            }
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                ctx.with_scope(Scope::Cte, false, false, |ctx| cte.render(ctx))?;
            }
            ctx.literal(" ");
        }

        ctx.literal("SELECT ");
        if self.distinct || !self.distinct_on.is_empty() {
            ctx.literal("DISTINCT ");
            if !self.distinct_on.is_empty() {
                ctx.literal("ON (");
                for (i, node) in self.distinct_on.iter().enumerate() {
                    if i > 0 {
                        ctx.literal(", ");
                    }
                    node.render(ctx)?;
                }
                ctx.literal(") ");
            }
        }
        if self.projection.is_empty() {
            ctx.literal("*");
        } else {
            for (i, node) in self.projection.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                node.render(ctx)?;
            }
        }

        if let Some(from) = &self.from {
            ctx.literal(" FROM ");
            ctx.with_scope(Scope::Source, false, false, |ctx| from.render(ctx))?;
        }

        if let Some(where_clause) = &self.where_clause {
            ctx.literal(" WHERE ");
            where_clause.render(ctx)?;
        }

        if !self.group_by.is_empty() {
            ctx.literal(" GROUP BY ");
            for (i, node) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                node.render(ctx)?;
            }
        }

        if let Some(having) = &self.having {
            ctx.literal(" HAVING ");
            having.render(ctx)?;
        }

        if !self.windows.is_empty() {
            ctx.literal(" WINDOW ");
            for (i, window) in self.windows.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                window.render(ctx)?;
            }
        }

        if !self.order_by.is_empty() {
            ctx.literal(" ORDER BY ");
            for (i, ordering) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                ordering.render(ctx)?;
            }
        }

        // If OFFSET is set without LIMIT and the dialect requires a LIMIT to
        // make OFFSET legal, synthesize one (§4.3).
        let limit = self
            .limit
            .or_else(|| self.offset.and_then(|_| ctx.dialect().limit_max()));
        if let Some(limit) = limit {
            ctx.literal(" LIMIT ");
            ctx.literal(&limit.to_string());
        }
        if let Some(offset) = self.offset {
            ctx.literal(" OFFSET ");
            ctx.literal(&offset.to_string());
        }

        if let Some(mode) = &self.for_update {
            if !ctx.dialect().supports_for_update() {
                return Err(QuarryError::NotSupported(
                    "FOR UPDATE is not supported by this dialect".into(),
                ));
            }
            ctx.literal(" FOR UPDATE");
            if !mode.is_empty() {
                ctx.literal(" ");
                ctx.literal(mode);
            }
        }

        Ok(())
    }
}

impl Render for Select {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        render_subquery(ctx, self.id, |ctx| self.render_body(ctx))
    }
}

/// Shared wrapping logic for a statement embedded somewhere other than the
/// top level: as a FROM source it gets `(...) AS alias`; anywhere else
/// (scalar/correlated subquery) it just gets `(...)` (§4.3).
pub(super) fn render_subquery(
    ctx: &mut Context,
    id: SourceId,
    body: impl FnOnce(&mut Context) -> Result<()>,
) -> Result<()> {
    let is_source = ctx.scope() == Scope::Source;
    ctx.with_alias_scope(|ctx| {
        ctx.with_scope(Scope::Normal, true, true, |ctx| {
            ctx.literal("(");
            body(ctx)?;
            ctx.literal(")");
            Ok(())
        })
    })?;
    if is_source {
        let alias = ctx.alias_for(id);
        ctx.literal(" AS ");
        super::Entity::single(alias).render(ctx)?;
    }
    Ok(())
}

impl Node {
    /// Renders a `Select`/`CompoundSelect` statement body with no wrapping —
    /// used by CTEs and compound-select arms that manage their own parens.
    pub(crate) fn render_statement_body(&self, ctx: &mut Context) -> Result<()> {
        match self {
            Node::Select(s) => s.render_body(ctx),
            Node::CompoundSelect(c) => c.render_body(ctx),
            other => other.render(ctx),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl CompoundOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompoundOp::Union => "UNION",
            CompoundOp::UnionAll => "UNION ALL",
            CompoundOp::Intersect => "INTERSECT",
            CompoundOp::Except => "EXCEPT",
        }
    }
}

/// `lhs op rhs`, left-associative; its own ORDER BY/LIMIT/OFFSET apply to
/// the compound as a whole, not to `rhs` (§4.3, §8).
#[derive(Debug, Clone)]
pub struct CompoundSelect {
    pub id: SourceId,
    pub lhs: Node,
    pub op: CompoundOp,
    pub rhs: Node,
    pub order_by: Vec<Ordering>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl CompoundSelect {
    pub fn new(lhs: Node, op: CompoundOp, rhs: Node) -> Self {
        CompoundSelect {
            id: super::entity::next_source_id(),
            lhs,
            op,
            rhs,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn render_arm(node: &Node, ctx: &mut Context, force_parens: bool) -> Result<()> {
        if force_parens {
            ctx.literal("(");
            node.render_statement_body(ctx)?;
            ctx.literal(")");
            Ok(())
        } else {
            node.render_statement_body(ctx)
        }
    }

    pub fn render_body(&self, ctx: &mut Context) -> Result<()> {
        let force_parens = ctx.dialect().compound_select_parens();
        Self::render_arm(&self.lhs, ctx, force_parens)?;
        ctx.literal(" ");
        ctx.literal(self.op.as_sql());
        ctx.literal(" ");
        Self::render_arm(&self.rhs, ctx, force_parens)?;

        if !self.order_by.is_empty() {
            ctx.literal(" ORDER BY ");
            for (i, ordering) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                ordering.render(ctx)?;
            }
        }
        if let Some(limit) = self.limit {
            ctx.literal(" LIMIT ");
            ctx.literal(&limit.to_string());
        }
        if let Some(offset) = self.offset {
            ctx.literal(" OFFSET ");
            ctx.literal(&offset.to_string());
        }
        Ok(())
    }
}

impl Render for CompoundSelect {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        render_subquery(ctx, self.id, |ctx| self.render_body(ctx))
    }
}
