use compact_str::CompactString;

use super::{Node, Ordering};
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
    Groups,
}

impl FrameUnit {
    fn as_sql(self) -> &'static str {
        match self {
            FrameUnit::Rows => "ROWS",
            FrameUnit::Range => "RANGE",
            FrameUnit::Groups => "GROUPS",
        }
    }
}

#[derive(Debug, Clone)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(i64),
    CurrentRow,
    Following(i64),
    UnboundedFollowing,
}

impl FrameBound {
    fn render(&self, ctx: &mut Context) {
        match self {
            FrameBound::UnboundedPreceding => ctx.literal("UNBOUNDED PRECEDING"),
            FrameBound::Preceding(n) => {
                ctx.literal(&n.to_string());
                ctx.literal(" PRECEDING")
            }
            FrameBound::CurrentRow => ctx.literal("CURRENT ROW"),
            FrameBound::Following(n) => {
                ctx.literal(&n.to_string());
                ctx.literal(" FOLLOWING")
            }
            FrameBound::UnboundedFollowing => ctx.literal("UNBOUNDED FOLLOWING"),
        };
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: FrameBound,
}

/// `alias AS (PARTITION BY ... ORDER BY ... ROWS BETWEEN a AND b)` (§3).
#[derive(Debug, Clone)]
pub struct Window {
    pub alias: CompactString,
    pub partition_by: Vec<Node>,
    pub order_by: Vec<Ordering>,
    pub frame: Option<Frame>,
}

impl Window {
    pub fn new(alias: impl Into<CompactString>) -> Self {
        Window {
            alias: alias.into(),
            partition_by: Vec::new(),
            order_by: Vec::new(),
            frame: None,
        }
    }

    pub fn partition_by(mut self, nodes: Vec<Node>) -> Self {
        self.partition_by = nodes;
        self
    }

    pub fn order_by(mut self, orderings: Vec<Ordering>) -> Self {
        self.order_by = orderings;
        self
    }

    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }
}

impl Render for Window {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        crate::ast::Entity::single(self.alias.clone()).render(ctx)?;
        ctx.literal(" AS (");
        let mut wrote = false;
        if !self.partition_by.is_empty() {
            ctx.literal("PARTITION BY ");
            for (i, node) in self.partition_by.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                node.render(ctx)?;
            }
            wrote = true;
        }
        if !self.order_by.is_empty() {
            if wrote {
                ctx.literal(" ");
            }
            ctx.literal("ORDER BY ");
            for (i, ordering) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                ordering.render(ctx)?;
            }
            wrote = true;
        }
        if let Some(frame) = &self.frame {
            if wrote {
                ctx.literal(" ");
            }
            ctx.literal(frame.unit.as_sql());
            ctx.literal(" BETWEEN ");
            frame.start.render(ctx);
            ctx.literal(" AND ");
            frame.end.render(ctx);
        }
        ctx.literal(")");
        Ok(())
    }
}
