use std::rc::Rc;

use compact_str::CompactString;
use indexmap::IndexMap;

use super::{SelectQuery, Statement};
use crate::ast::{Entity, Node, Table};
use crate::context::{Context, Scope};
use crate::dialect::{ConflictClauseStyle, OnConflict};
use crate::error::Result;
use crate::value::Value;

/// The three INSERT shapes (§4.4).
#[derive(Debug, Clone)]
pub enum InsertData {
    /// A single `column -> value` mapping.
    Simple(IndexMap<CompactString, Node>),
    /// Several rows. Columns are explicit, or inferred from the first row.
    Multi {
        columns: Option<Vec<CompactString>>,
        rows: Vec<IndexMap<CompactString, Node>>,
    },
    /// `INSERT INTO t (cols) <select>`.
    Query {
        columns: Vec<CompactString>,
        select: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct InsertQuery {
    table: Rc<Table>,
    data: InsertData,
    conflict: OnConflict,
    returning: Vec<Node>,
}

impl InsertQuery {
    pub fn new(table: Rc<Table>, data: InsertData) -> Self {
        InsertQuery {
            table,
            data,
            conflict: OnConflict::default(),
            returning: Vec::new(),
        }
    }

    pub fn simple(table: Rc<Table>, row: IndexMap<CompactString, Node>) -> Self {
        Self::new(table, InsertData::Simple(row))
    }

    pub fn multi(
        table: Rc<Table>,
        rows: Vec<IndexMap<CompactString, Node>>,
        columns: Option<Vec<CompactString>>,
    ) -> Self {
        Self::new(table, InsertData::Multi { columns, rows })
    }

    pub fn from_query(table: Rc<Table>, columns: Vec<CompactString>, select: SelectQuery) -> Self {
        Self::new(
            table,
            InsertData::Query {
                columns,
                select: Box::new(select.into_node()),
            },
        )
    }

    pub fn on_conflict(mut self, conflict: OnConflict) -> Self {
        self.conflict = conflict;
        self
    }

    pub fn returning(mut self, projection: Vec<Node>) -> Self {
        self.returning = projection;
        self
    }

    fn row_columns(first: &IndexMap<CompactString, Node>) -> Vec<CompactString> {
        first.keys().cloned().collect()
    }

    fn render_columns_and_values(&self, ctx: &mut Context) -> Result<()> {
        match &self.data {
            InsertData::Simple(row) => {
                if row.is_empty() {
                    ctx.literal(ctx.dialect().default_values_insert());
                    return Ok(());
                }
                render_column_list(ctx, row.keys())?;
                ctx.literal(" VALUES (");
                for (i, value) in row.values().enumerate() {
                    if i > 0 {
                        ctx.literal(", ");
                    }
                    value.render(ctx)?;
                }
                ctx.literal(")");
                Ok(())
            }
            InsertData::Multi { columns, rows } => {
                if rows.is_empty() {
                    ctx.literal(ctx.dialect().default_values_insert());
                    return Ok(());
                }
                let columns = columns
                    .clone()
                    .unwrap_or_else(|| Self::row_columns(&rows[0]));
                render_column_list(ctx, columns.iter())?;
                ctx.literal(" VALUES ");
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        ctx.literal(", ");
                    }
                    ctx.literal("(");
                    for (j, col) in columns.iter().enumerate() {
                        if j > 0 {
                            ctx.literal(", ");
                        }
                        match row.get(col) {
                            Some(node) => node.render(ctx)?,
                            None => Node::value(Value::Null).render(ctx)?,
                        }
                    }
                    ctx.literal(")");
                }
                Ok(())
            }
            InsertData::Query { columns, select } => {
                render_column_list(ctx, columns.iter())?;
                ctx.literal(" ");
                select.render(ctx)
            }
        }
    }

    fn render_conflict_clause(&self, ctx: &mut Context) -> Result<()> {
        if self.conflict.is_empty() {
            return Ok(());
        }
        if ctx.dialect().conflict_statement(&self.conflict).is_some() {
            // Already expressed as a statement-prefix rewrite.
            return Ok(());
        }
        match ctx.dialect().conflict_clause_style() {
            ConflictClauseStyle::None => Ok(()),
            ConflictClauseStyle::Postgres => {
                ctx.literal(" ON CONFLICT");
                if !self.conflict.target.is_empty() {
                    ctx.literal(" (");
                    for (i, col) in self.conflict.target.iter().enumerate() {
                        if i > 0 {
                            ctx.literal(", ");
                        }
                        Entity::single(col.clone()).render(ctx)?;
                    }
                    ctx.literal(")");
                } else if let Some(constraint) = &self.conflict.constraint {
                    ctx.literal(" ON CONSTRAINT ");
                    Entity::single(constraint.clone()).render(ctx)?;
                }
                if self.conflict.update.is_empty() {
                    ctx.literal(" DO NOTHING");
                } else {
                    ctx.literal(" DO UPDATE SET ");
                    for (i, (col, value)) in self.conflict.update.iter().enumerate() {
                        if i > 0 {
                            ctx.literal(", ");
                        }
                        Entity::single(col.clone()).render(ctx)?;
                        ctx.literal(" = ");
                        value.render(ctx)?;
                    }
                    if let Some(where_clause) = &self.conflict.where_clause {
                        ctx.literal(" WHERE ");
                        where_clause.render(ctx)?;
                    }
                }
                Ok(())
            }
            ConflictClauseStyle::MySql => {
                ctx.literal(" ON DUPLICATE KEY UPDATE ");
                let mut wrote = false;
                for (col, value) in &self.conflict.update {
                    if wrote {
                        ctx.literal(", ");
                    }
                    Entity::single(col.clone()).render(ctx)?;
                    ctx.literal(" = ");
                    value.render(ctx)?;
                    wrote = true;
                }
                for col in &self.conflict.preserve {
                    if wrote {
                        ctx.literal(", ");
                    }
                    Entity::single(col.clone()).render(ctx)?;
                    ctx.literal(" = VALUES(");
                    Entity::single(col.clone()).render(ctx)?;
                    ctx.literal(")");
                    wrote = true;
                }
                Ok(())
            }
        }
    }
}

fn render_column_list<'a>(
    ctx: &mut Context,
    columns: impl Iterator<Item = &'a CompactString>,
) -> Result<()> {
    ctx.literal("(");
    let mut wrote = false;
    for col in columns {
        if wrote {
            ctx.literal(", ");
        }
        Entity::single(col.clone()).render(ctx)?;
        wrote = true;
    }
    ctx.literal(")");
    Ok(())
}

impl Statement for InsertQuery {
    fn render(&self, ctx: &mut Context) -> Result<()> {
        ctx.dialect().validate_conflict(&self.conflict)?;

        let prefix = ctx
            .dialect()
            .conflict_statement(&self.conflict)
            .unwrap_or_else(|| "INSERT".into());
        ctx.literal(&prefix);
        ctx.literal(" INTO ");
        ctx.with_scope(Scope::Values, false, false, |ctx| self.table.render(ctx))?;
        ctx.literal(" ");
        self.render_columns_and_values(ctx)?;
        self.render_conflict_clause(ctx)?;

        if ctx.dialect().supports_returning() && !self.returning.is_empty() {
            ctx.literal(" RETURNING ");
            for (i, node) in self.returning.iter().enumerate() {
                if i > 0 {
                    ctx.literal(", ");
                }
                node.render(ctx)?;
            }
        }
        Ok(())
    }
}
