use compact_str::CompactString;

use super::Node;
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// `expr ASC|DESC [COLLATE x] [NULLS FIRST|LAST]` (§3).
#[derive(Debug, Clone)]
pub struct Ordering {
    pub node: Node,
    pub direction: Option<OrderingDirection>,
    pub collation: Option<CompactString>,
    pub nulls: Option<Nulls>,
}

impl Ordering {
    pub fn new(node: Node) -> Self {
        Ordering {
            node,
            direction: None,
            collation: None,
            nulls: None,
        }
    }

    pub fn asc(node: Node) -> Self {
        Ordering::new(node).direction(OrderingDirection::Asc)
    }

    pub fn desc(node: Node) -> Self {
        Ordering::new(node).direction(OrderingDirection::Desc)
    }

    pub fn direction(mut self, direction: OrderingDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn collate(mut self, collation: impl Into<CompactString>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn nulls(mut self, nulls: Nulls) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

impl Render for Ordering {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        self.node.render(ctx)?;
        if let Some(direction) = self.direction {
            ctx.literal(match direction {
                OrderingDirection::Asc => " ASC",
                OrderingDirection::Desc => " DESC",
            });
        }
        if let Some(collation) = &self.collation {
            ctx.literal(" COLLATE ");
            ctx.literal(collation);
        }
        if let Some(nulls) = self.nulls {
            ctx.literal(match nulls {
                Nulls::First => " NULLS FIRST",
                Nulls::Last => " NULLS LAST",
            });
        }
        Ok(())
    }
}
