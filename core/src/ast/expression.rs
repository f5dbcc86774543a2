use std::rc::Rc;

use compact_str::CompactString;

use super::{Node, Param};
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;
use crate::value::{Converter, Value};

/// A binary operator expression (§3). Operators are dialect-remappable
/// (e.g. SQLite maps `LIKE` to `GLOB`, MySQL maps `LIKE` to `LIKE BINARY`).
#[derive(Debug, Clone)]
pub struct Expression {
    pub lhs: Box<Node>,
    pub op: CompactString,
    pub rhs: Box<Node>,
    /// Suppresses this expression's own parenthesization — set by an
    /// enclosing `NodeList(parens=true)` to avoid double-wrapping (§4.2).
    pub flat: bool,
    /// Converter applied to the RHS parameters while they render, injected
    /// when the LHS is a model field (§4.2 "converter injection").
    pub converter: Option<Rc<dyn Converter>>,
}

impl Expression {
    pub fn new(lhs: Node, op: impl Into<CompactString>, rhs: Node) -> Self {
        Expression {
            lhs: Box::new(lhs),
            op: op.into(),
            rhs: Box::new(rhs),
            flat: false,
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: Rc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn flat(mut self) -> Self {
        self.flat = true;
        self
    }

    fn is_empty_in(&self) -> bool {
        (self.op == "IN" || self.op == "NOT IN") && is_empty_multi_param(&self.rhs)
    }

    fn rhs_is_null(&self) -> bool {
        matches!(&*self.rhs, Node::Param(Param { value: Value::Null, .. }))
    }
}

fn is_empty_multi_param(node: &Node) -> bool {
    matches!(node, Node::Param(p) if p.multi && matches!(&p.value, Value::List(v) if v.is_empty()))
}

impl Render for Expression {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        if !self.flat {
            ctx.literal("(");
        }

        if self.is_empty_in() {
            // `IN ()` is never emitted (§4.2, §8): an empty set degenerates
            // to a constant-false (or constant-true for NOT IN) fragment
            // with zero bound parameters.
            ctx.literal(if self.op == "IN" { "0 = 1" } else { "1 = 1" });
        } else {
            let op: &str = if self.rhs_is_null() {
                match self.op.as_str() {
                    "=" => "IS",
                    "!=" | "<>" => "IS NOT",
                    other => other,
                }
            } else {
                &self.op
            };
            let op = ctx.dialect().remap_operator(op).to_string();

            self.lhs.render(ctx)?;
            ctx.literal(" ");
            ctx.literal(&op);
            ctx.literal(" ");

            if let Some(converter) = &self.converter {
                ctx.push_converter(converter.clone());
            }
            let result = self.rhs.render(ctx);
            if self.converter.is_some() {
                ctx.pop_converter();
            }
            result?;
        }

        if !self.flat {
            ctx.literal(")");
        }
        Ok(())
    }
}
