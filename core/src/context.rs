//! The SQL text/parameter accumulator and its scope stack (§4.1).

use std::rc::Rc;

use smallvec::{smallvec, SmallVec};

use crate::alias::{AliasManager, SourceId};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::value::{Converter, Value};

/// Rendering mode. Alters how sources and columns print (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Columns render `alias.name`; sources render by alias.
    Normal,
    /// Sources render as `fqname AS alias`; used inside a `FROM` list.
    Source,
    /// Used inside INSERT/UPDATE/DELETE: bare table name, bare column name.
    Values,
    /// Used once, to emit `WITH name[(cols)] AS (...)`.
    Cte,
    /// Used when a subquery appears as a column reference: print the alias,
    /// not the subquery body.
    Column,
}

/// One frame of the context's scope stack.
///
/// `parentheses` and `subquery` are NOT inherited from the enclosing frame —
/// every scope decides them explicitly when it's pushed (§4.1).
#[derive(Debug, Clone)]
pub struct State {
    pub scope: Scope,
    pub parentheses: bool,
    pub subquery: bool,
}

impl State {
    fn new(scope: Scope) -> Self {
        State {
            scope,
            parentheses: false,
            subquery: false,
        }
    }
}

/// Accumulates rendered SQL text and bound parameters while walking an AST.
pub struct Context {
    dialect: Rc<dyn Dialect>,
    sql: String,
    params: Vec<Value>,
    /// Most queries never nest more than a handful of scopes deep (a
    /// top-level statement plus a subquery or two), so inline storage for
    /// the common case avoids a heap allocation per render (§4.1).
    state_stack: SmallVec<[State; 4]>,
    converters: Vec<Rc<dyn Converter>>,
    aliases: AliasManager,
}

impl Context {
    pub fn new(dialect: Rc<dyn Dialect>) -> Self {
        Context {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            state_stack: smallvec![State::new(Scope::Normal)],
            converters: Vec::new(),
            aliases: AliasManager::new(),
        }
    }

    pub fn dialect(&self) -> &Rc<dyn Dialect> {
        &self.dialect
    }

    pub fn state(&self) -> &State {
        self.state_stack.last().expect("non-empty state stack")
    }

    fn state_mut(&mut self) -> &mut State {
        self.state_stack.last_mut().expect("non-empty state stack")
    }

    pub fn scope(&self) -> Scope {
        self.state().scope
    }

    /// Runs `f` with a freshly pushed scope, restoring the previous one
    /// afterwards regardless of whether `f` returns an error.
    pub fn with_scope<T>(
        &mut self,
        scope: Scope,
        parentheses: bool,
        subquery: bool,
        f: impl FnOnce(&mut Context) -> Result<T>,
    ) -> Result<T> {
        self.state_stack.push(State {
            scope,
            parentheses,
            subquery,
        });
        let result = f(self);
        self.state_stack.pop();
        result
    }

    /// Saves the alias-manager depth, runs `f`, then restores it — used
    /// when rendering a subquery that must not leak its inner scope aliases
    /// into the outer query once done.
    pub fn with_alias_scope<T>(&mut self, f: impl FnOnce(&mut Context) -> Result<T>) -> Result<T> {
        self.aliases.push();
        let depth = self.aliases.depth();
        let result = f(self);
        self.aliases.truncate_to(depth - 1);
        result
    }

    pub fn alias_for(&mut self, source: SourceId) -> compact_str::CompactString {
        self.aliases.get(source, true)
    }

    pub fn peek_alias(&self, source: SourceId) -> Option<compact_str::CompactString> {
        self.aliases.peek(source)
    }

    /// Pushes a converter that RHS parameter values will be run through
    /// until popped (§4.2 "converter injection").
    pub fn push_converter(&mut self, converter: Rc<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn pop_converter(&mut self) {
        self.converters.pop();
    }

    fn current_converter(&self) -> Option<Rc<dyn Converter>> {
        self.converters.last().cloned()
    }

    /// Appends raw SQL text verbatim.
    pub fn literal(&mut self, s: &str) -> &mut Self {
        self.sql.push_str(s);
        self
    }

    /// Appends the next parameter placeholder and binds `value`, running it
    /// through the currently active converter if one is set.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.push_param(value);
        let marker = self.dialect.param_marker(self.params.len());
        self.sql.push_str(&marker);
        self
    }

    /// Records a parameter value without emitting a placeholder — used by
    /// [`crate::ast::Sql`], whose literal text already carries the
    /// dialect-appropriate marker characters written by the caller.
    pub fn push_param(&mut self, value: Value) -> &mut Self {
        let value = match self.current_converter() {
            Some(conv) => conv.db_value(&value),
            None => value,
        };
        self.params.push(value);
        self
    }

    /// Appends `open`/`close` around the result of `f` only if
    /// `state().parentheses` was not already requesting them (used by nodes
    /// that own their own parenthesization decision).
    pub fn parens(&mut self, f: impl FnOnce(&mut Context) -> Result<()>) -> Result<()> {
        self.literal("(");
        f(self)?;
        self.literal(")");
        Ok(())
    }

    pub fn sql(&mut self) -> &str {
        &self.sql
    }

    /// Consumes the context, returning the final `(sql, params)` pair.
    pub fn query(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}
