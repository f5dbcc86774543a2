use compact_str::CompactString;

use super::Node;
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;
use crate::value::Value;

/// `node AS "name"` — thin wrapper used for projection aliases (§3).
#[derive(Debug, Clone)]
pub struct Alias {
    pub node: Node,
    pub name: CompactString,
}

impl Alias {
    pub fn new(node: Node, name: impl Into<CompactString>) -> Self {
        Alias { node, name: name.into() }
    }
}

impl Render for Alias {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        self.node.render(ctx)?;
        ctx.literal(" AS ");
        super::Entity::single(self.name.clone()).render(ctx)
    }
}

/// `CAST(node AS type)` (§3).
#[derive(Debug, Clone)]
pub struct Cast {
    pub node: Node,
    pub sql_type: CompactString,
}

impl Cast {
    pub fn new(node: Node, sql_type: impl Into<CompactString>) -> Self {
        Cast {
            node,
            sql_type: sql_type.into(),
        }
    }
}

impl Render for Cast {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("CAST(");
        self.node.render(ctx)?;
        ctx.literal(" AS ");
        ctx.literal(&self.sql_type);
        ctx.literal(")");
        Ok(())
    }
}

/// `NOT node` (§3).
#[derive(Debug, Clone)]
pub struct Negated {
    pub node: Node,
}

impl Negated {
    pub fn new(node: Node) -> Self {
        Negated { node }
    }
}

impl Render for Negated {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("NOT ");
        self.node.render(ctx)
    }
}

/// `CHECK (node)` — used in DDL constraint lists (§3, §4.9).
#[derive(Debug, Clone)]
pub struct Check {
    pub node: Node,
}

impl Check {
    pub fn new(node: Node) -> Self {
        Check { node }
    }
}

impl Render for Check {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal("CHECK (");
        self.node.render(ctx)?;
        ctx.literal(")");
        Ok(())
    }
}

/// A raw SQL literal carrying its own already-positioned parameter values,
/// the escape hatch for hand-written fragments (§3).
#[derive(Debug, Clone)]
pub struct Sql {
    pub literal: CompactString,
    pub params: Vec<Value>,
}

impl Sql {
    pub fn new(literal: impl Into<CompactString>, params: Vec<Value>) -> Self {
        Sql {
            literal: literal.into(),
            params,
        }
    }
}

impl Render for Sql {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal(&self.literal.clone());
        for param in &self.params {
            ctx.push_param(param.clone());
        }
        Ok(())
    }
}
