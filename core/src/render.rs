//! Single rendering contract shared by AST nodes and statement builders.

use crate::context::Context;
use crate::error::Result;

/// Every node and every query builder exposes exactly one operation: render
/// itself into a [`Context`] (§3: "Node ... exposes one operation: render
/// into a Context").
pub trait Render {
    fn render(&self, ctx: &mut Context) -> Result<()>;
}
