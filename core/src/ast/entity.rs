use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use compact_str::CompactString;

use crate::alias::SourceId;
use crate::context::{Context, Scope};
use crate::error::Result;
use crate::render::Render;

static SOURCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocates a fresh, process-unique [`SourceId`] for a new `Table`/`Cte`
/// value. Each distinct `Table::new(..)` call is a distinct source; callers
/// that want repeated references to resolve to the same alias must clone
/// the `Rc<Table>` rather than constructing a new one (mirrors a Model's
/// single shared table proxy, §3).
pub fn next_source_id() -> SourceId {
    SOURCE_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A quoted identifier, possibly dotted (`schema.table` or `table.column`).
/// Path components are escaped by doubling the quote character (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub path: Vec<CompactString>,
}

impl Entity {
    pub fn new(path: impl IntoIterator<Item = impl Into<CompactString>>) -> Self {
        Entity {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn single(name: impl Into<CompactString>) -> Self {
        Entity {
            path: vec![name.into()],
        }
    }
}

impl Render for Entity {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        let quote = ctx.dialect().quote_char();
        for (i, part) in self.path.iter().enumerate() {
            if i > 0 {
                ctx.literal(".");
            }
            ctx.literal(&quote.to_string());
            ctx.literal(&part.replace(quote, &format!("{q}{q}", q = quote)));
            ctx.literal(&quote.to_string());
        }
        Ok(())
    }
}

/// A table usable as a FROM source. Always held behind `Rc` so repeated
/// references within a query share one [`SourceId`] and therefore one alias.
#[derive(Debug, Clone)]
pub struct Table {
    pub id: SourceId,
    pub schema: Option<CompactString>,
    pub name: CompactString,
    pub alias: Option<CompactString>,
}

impl Table {
    pub fn new(name: impl Into<CompactString>) -> std::rc::Rc<Table> {
        std::rc::Rc::new(Table {
            id: next_source_id(),
            schema: None,
            name: name.into(),
            alias: None,
        })
    }

    pub fn with_schema(mut self, schema: impl Into<CompactString>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn aliased(mut self, alias: impl Into<CompactString>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn entity(&self) -> Entity {
        match &self.schema {
            Some(schema) => Entity::new([schema.clone(), self.name.clone()]),
            None => Entity::single(self.name.clone()),
        }
    }
}

impl Render for Table {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        match ctx.scope() {
            Scope::Source => {
                self.entity().render(ctx)?;
                let alias = match &self.alias {
                    Some(a) => a.clone(),
                    None => ctx.alias_for(self.id),
                };
                ctx.literal(" AS ");
                crate::ast::Entity::single(alias).render(ctx)
            }
            Scope::Values => self.entity().render(ctx),
            _ => {
                let alias = self
                    .alias
                    .clone()
                    .unwrap_or_else(|| ctx.alias_for(self.id));
                crate::ast::Entity::single(alias).render(ctx)
            }
        }
    }
}

/// A named subquery bound via `WITH` (§3, §4.3).
#[derive(Debug, Clone)]
pub struct Cte {
    pub id: SourceId,
    pub name: CompactString,
    pub columns: Vec<CompactString>,
    pub recursive: bool,
    pub query: Box<super::Select>,
}

impl Cte {
    pub fn new(name: impl Into<CompactString>, query: super::Select) -> std::rc::Rc<Cte> {
        std::rc::Rc::new(Cte {
            id: next_source_id(),
            name: name.into(),
            columns: Vec::new(),
            recursive: false,
            query: Box::new(query),
        })
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<CompactString>>) -> Self {
        self.columns = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }
}

impl Render for Cte {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        match ctx.scope() {
            Scope::Cte => {
                crate::ast::Entity::single(self.name.clone()).render(ctx)?;
                if !self.columns.is_empty() {
                    ctx.literal(" (");
                    for (i, col) in self.columns.iter().enumerate() {
                        if i > 0 {
                            ctx.literal(", ");
                        }
                        crate::ast::Entity::single(col.clone()).render(ctx)?;
                    }
                    ctx.literal(")");
                }
                ctx.literal(" AS (");
                ctx.with_scope(Scope::Normal, true, true, |ctx| self.query.render_body(ctx))?;
                ctx.literal(")");
                Ok(())
            }
            // A CTE's own name is already its identity once introduced by
            // `WITH`; referencing it elsewhere never needs a fresh `tN`.
            _ => crate::ast::Entity::single(self.name.clone()).render(ctx),
        }
    }
}
