use super::Node;
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;

/// `CASE [operand] WHEN cond THEN result ... [ELSE else] END` (§3).
#[derive(Debug, Clone)]
pub struct Case {
    pub operand: Option<Node>,
    pub whens: Vec<(Node, Node)>,
    pub otherwise: Option<Node>,
}

impl Case {
    pub fn new(whens: Vec<(Node, Node)>) -> Self {
        Case {
            operand: None,
            whens,
            otherwise: None,
        }
    }

    pub fn operand(mut self, operand: Node) -> Self {
        self.operand = Some(operand);
        self
    }

    pub fn otherwise(mut self, otherwise: Node) -> Self {
        self.otherwise = Some(otherwise);
        self
    }
}

impl Render for Case {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("CASE");
        if let Some(operand) = &self.operand {
            ctx.literal(" ");
            operand.render(ctx)?;
        }
        for (cond, result) in &self.whens {
            ctx.literal(" WHEN ");
            cond.render(ctx)?;
            ctx.literal(" THEN ");
            result.render(ctx)?;
        }
        if let Some(otherwise) = &self.otherwise {
            ctx.literal(" ELSE ");
            otherwise.render(ctx)?;
        }
        ctx.literal(" END");
        Ok(())
    }
}
