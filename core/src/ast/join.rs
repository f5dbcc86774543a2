use super::Node;
use crate::context::{Context, Scope};
use crate::error::Result;
use crate::render::Render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    fn as_sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT OUTER JOIN",
            JoinType::Right => "RIGHT OUTER JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// A joined FROM source, associative via the builder but always rendered
/// left-deep (§3).
#[derive(Debug, Clone)]
pub struct Join {
    pub lhs: Node,
    pub rhs: Node,
    pub join_type: JoinType,
    pub on: Option<Node>,
}

impl Join {
    pub fn new(lhs: Node, rhs: Node, join_type: JoinType, on: Option<Node>) -> Self {
        Join {
            lhs,
            rhs,
            join_type,
            on,
        }
    }
}

impl Render for Join {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        self.lhs.render(ctx)?;
        ctx.literal(" ");
        ctx.literal(self.join_type.as_sql());
        ctx.literal(" ");
        self.rhs.render(ctx)?;
        if let Some(on) = &self.on {
            ctx.literal(" ON ");
            // The ON clause qualifies columns normally even though the join
            // itself renders under `Scope::Source`.
            ctx.with_scope(Scope::Normal, false, false, |ctx| on.render(ctx))?;
        }
        Ok(())
    }
}
