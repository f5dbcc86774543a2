use compact_str::CompactString;

use crate::alias::SourceId;
use crate::context::{Context, Scope};
use crate::error::Result;
use crate::render::Render;

/// A qualified column reference. Renders as `alias.name` in [`Scope::Normal`],
/// bare `name` in [`Scope::Values`] (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub source: Option<SourceId>,
    pub name: CompactString,
}

impl Column {
    pub fn new(source: SourceId, name: impl Into<CompactString>) -> Self {
        Column {
            source: Some(source),
            name: name.into(),
        }
    }

    /// An unqualified column reference — always bare, regardless of scope.
    /// Used for INSERT column lists and VALUES-scope contexts.
    pub fn bare(name: impl Into<CompactString>) -> Self {
        Column {
            source: None,
            name: name.into(),
        }
    }
}

impl Render for Column {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        match (ctx.scope(), self.source) {
            (Scope::Values, _) | (_, None) => {
                super::Entity::single(self.name.clone()).render(ctx)
            }
            (_, Some(source)) => {
                let alias = ctx.alias_for(source);
                super::Entity::new([alias, self.name.clone()]).render(ctx)
            }
        }
    }
}
