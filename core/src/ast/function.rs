use compact_str::CompactString;

use super::Node;
use crate::context::Context;
use crate::error::Result;
use crate::render::Render;

/// `NAME(arg1, arg2, ...)` (§3). A function with a single subquery argument
/// is not double-parenthesized: the subquery already wraps itself, so the
/// function just emits its name directly in front of it.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: CompactString,
    pub args: Vec<Node>,
    /// When set, the function result is cast/coerced to this semantic type
    /// by the row materializer rather than by SQL (§4.7 "coercing Function").
    pub coerce: Option<CompactString>,
}

impl Function {
    pub fn new(name: impl Into<CompactString>, args: Vec<Node>) -> Self {
        Function {
            name: name.into(),
            args,
            coerce: None,
        }
    }

    pub fn coerce(mut self, semantic_type: impl Into<CompactString>) -> Self {
        self.coerce = Some(semantic_type.into());
        self
    }

    fn sole_subquery_arg(&self) -> Option<&Node> {
        match self.args.as_slice() {
            [single] if single.self_parenthesizes() => Some(single),
            _ => None,
        }
    }
}

impl Render for Function {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.literal(&self.name);
        if let Some(subquery) = self.sole_subquery_arg() {
            subquery.render(ctx)
        } else {
            ctx.literal("(");
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                arg.render(ctx)?;
            }
            ctx.literal(")");
            Ok(())
        }
    }
}
