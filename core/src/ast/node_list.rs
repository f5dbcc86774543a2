use compact_str::CompactString;

use super::Node;
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;

/// An ordered sequence of nodes, joined by `glue`, optionally parenthesized
/// (§3). `CommaNodeList`/`EnclosedNodeList` from the spec are just
/// `NodeList::comma(..)` / `NodeList::comma(..).parenthesized()`.
#[derive(Debug, Clone)]
pub struct NodeList {
    pub children: Vec<Node>,
    pub glue: CompactString,
    pub parens: bool,
}

impl NodeList {
    pub fn new(children: Vec<Node>, glue: impl Into<CompactString>) -> Self {
        NodeList {
            children,
            glue: glue.into(),
            parens: false,
        }
    }

    pub fn comma(children: Vec<Node>) -> Self {
        Self::new(children, ", ")
    }

    pub fn space(children: Vec<Node>) -> Self {
        Self::new(children, " ")
    }

    pub fn parenthesized(mut self) -> Self {
        self.parens = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Render for NodeList {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        // Parentheses economy (§4.2, §8): a NodeList(parens=true) wrapping a
        // single already-parenthesizing Expression marks the child `flat`
        // so the Expression doesn't also wrap itself — one pair of parens
        // total, supplied by this list, not two.
        let flatten_sole_child =
            self.parens && self.children.len() == 1 && self.children[0].self_parenthesizes();

        if self.parens {
            ctx.literal("(");
        }
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                ctx.literal(&self.glue);
            }
            if flatten_sole_child {
                child.render_flattened(ctx)?;
            } else {
                child.render(ctx)?;
            }
        }
        if self.parens {
            ctx.literal(")");
        }
        Ok(())
    }
}

impl Node {
    /// Renders a self-parenthesizing child without its own wrapping parens,
    /// so the enclosing `NodeList`'s parens supply the only pair.
    fn render_flattened(&self, ctx: &mut Context) -> Result<()> {
        match self {
            Node::Expression(e) => {
                let mut flat = (**e).clone();
                flat.flat = true;
                flat.render(ctx)
            }
            Node::Select(_) | Node::CompoundSelect(_) => self.render_statement_body(ctx),
            other => other.render(ctx),
        }
    }
}
