//! Per-connection transaction/savepoint/manual frame stack (§4.6).

use compact_str::CompactString;
use uuid::Uuid;

use crate::driver::Connection;
use crate::error::{QuarryError, Result};

/// One element of the transaction stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Outermost; begins with `BEGIN [mode]`; commits/rolls back only when
    /// the outermost frame exits.
    Transaction,
    /// Nested; `SAVEPOINT s<uuid>` on enter, `RELEASE SAVEPOINT` on normal
    /// exit, `ROLLBACK TO SAVEPOINT` on exception.
    Savepoint { name: CompactString },
    /// Disables autocommit; cannot be entered while a transaction or
    /// savepoint is already open.
    Manual,
}

/// Statement text a caller should execute to realize a frame transition.
/// The manager is deliberately driver-agnostic: it decides WHAT to run,
/// the caller's `Driver`/`Connection` runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameAction {
    Begin(CompactString),
    Commit,
    Rollback,
    Savepoint(CompactString),
    ReleaseSavepoint(CompactString),
    RollbackToSavepoint(CompactString),
}

/// Tracks the open frame stack for one connection. Does not itself talk to
/// a driver — `Database`/`ConnectionContext` drive it and execute the
/// returned [`FrameAction`]s.
#[derive(Debug, Default)]
pub struct TransactionManager {
    stack: Vec<Frame>,
}

impl TransactionManager {
    pub fn new() -> Self {
        TransactionManager { stack: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn in_transaction(&self) -> bool {
        !self.stack.is_empty()
    }

    /// `atomic`: transaction if the stack is empty, savepoint otherwise.
    pub fn push_atomic(&mut self) -> FrameAction {
        if self.stack.is_empty() {
            self.push_transaction("".into())
        } else {
            self.push_savepoint()
        }
    }

    pub fn push_transaction(&mut self, mode: CompactString) -> FrameAction {
        self.stack.push(Frame::Transaction);
        let begin = if mode.is_empty() {
            "BEGIN".to_string()
        } else {
            format!("BEGIN {mode}")
        };
        crate::quarry_trace_tx!("begin", self.stack.len());
        FrameAction::Begin(begin.into())
    }

    pub fn push_savepoint(&mut self) -> FrameAction {
        let name = format_savepoint_name();
        self.stack.push(Frame::Savepoint { name: name.clone() });
        crate::quarry_trace_tx!("savepoint", self.stack.len());
        FrameAction::Savepoint(name)
    }

    pub fn push_manual(&mut self) -> Result<FrameAction> {
        if self.in_transaction() {
            return Err(QuarryError::TransactionStackCorrupted);
        }
        self.stack.push(Frame::Manual);
        crate::quarry_trace_tx!("begin", self.stack.len());
        Ok(FrameAction::Begin("BEGIN".into()))
    }

    /// Pops the top frame on normal exit (no exception), returning the
    /// action the caller must execute to commit/release it.
    pub fn pop_commit(&mut self) -> Result<FrameAction> {
        let depth = self.stack.len();
        match self.stack.pop() {
            Some(Frame::Transaction) => {
                crate::quarry_trace_tx!("commit", depth);
                Ok(FrameAction::Commit)
            }
            Some(Frame::Savepoint { name }) => {
                crate::quarry_trace_tx!("release_savepoint", depth);
                Ok(FrameAction::ReleaseSavepoint(name))
            }
            Some(Frame::Manual) => {
                crate::quarry_trace_tx!("commit", depth);
                Ok(FrameAction::Commit)
            }
            None => Err(QuarryError::TransactionStackCorrupted),
        }
    }

    /// Pops the top frame on exceptional exit, returning the action the
    /// caller must execute to roll it back.
    pub fn pop_rollback(&mut self) -> Result<FrameAction> {
        let depth = self.stack.len();
        match self.stack.pop() {
            Some(Frame::Transaction) => {
                crate::quarry_trace_tx!("rollback", depth);
                Ok(FrameAction::Rollback)
            }
            Some(Frame::Savepoint { name }) => {
                crate::quarry_trace_tx!("rollback_to_savepoint", depth);
                Ok(FrameAction::RollbackToSavepoint(name))
            }
            Some(Frame::Manual) => {
                crate::quarry_trace_tx!("rollback", depth);
                Ok(FrameAction::Rollback)
            }
            None => Err(QuarryError::TransactionStackCorrupted),
        }
    }

    /// Verifies a pop matches the expected top frame — guards against the
    /// "mismatched pop" hard error (§4.6).
    pub fn expect_top(&self, frame: &Frame) -> Result<()> {
        match self.stack.last() {
            Some(top) if top == frame => Ok(()),
            _ => Err(QuarryError::TransactionStackCorrupted),
        }
    }

    /// §4.6: `execute_sql` auto-commits only when no frame is open AND
    /// (the dialect requires commit for SELECT OR the statement isn't a
    /// SELECT).
    pub fn should_autocommit(&self, dialect_commit_select: bool, is_select: bool) -> bool {
        !self.in_transaction() && (dialect_commit_select || !is_select)
    }
}

fn format_savepoint_name() -> CompactString {
    let id = Uuid::new_v4().simple().to_string();
    compact_str::format_compact!("s{}", id)
}

/// Runs `action`'s begin/commit/rollback/savepoint statement text against
/// `conn`, with no bound parameters — every frame transition is a bare DDL
/// statement (§4.6).
fn run_frame_action(conn: &mut dyn Connection, action: FrameAction) -> Result<()> {
    let sql = match action {
        FrameAction::Begin(sql) => sql,
        FrameAction::Commit => "COMMIT".into(),
        FrameAction::Rollback => "ROLLBACK".into(),
        FrameAction::Savepoint(name) => compact_str::format_compact!("SAVEPOINT {name}"),
        FrameAction::ReleaseSavepoint(name) => compact_str::format_compact!("RELEASE SAVEPOINT {name}"),
        FrameAction::RollbackToSavepoint(name) => compact_str::format_compact!("ROLLBACK TO SAVEPOINT {name}"),
    };
    conn.execute(&sql, &[])?;
    Ok(())
}

/// Owns one connection's [`TransactionManager`] and drives it through
/// scoped closures rather than exposing the raw push/pop primitives to
/// callers (§4.6, §9: `database.atomic(|tx| {...})`,
/// `database.transaction(...)`, `database.savepoint(...)`,
/// `database.manual(...)`).
///
/// Commits on `Ok`, rolls back on `Err` — there is no panic-unwind guard
/// here (unlike a Drop-based RAII guard) because the frame action needs the
/// closure's result to decide commit vs. rollback, and a fallible `execute`
/// already surfaces through `Result` rather than a panic.
#[derive(Debug)]
pub struct Database<C: Connection> {
    connection: C,
    manager: TransactionManager,
}

impl<C: Connection> Database<C> {
    pub fn new(connection: C) -> Self {
        Database {
            connection,
            manager: TransactionManager::new(),
        }
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Transaction if no frame is open, nested savepoint otherwise (§4.6
    /// "atomic").
    pub fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let action = self.manager.push_atomic();
        run_frame_action(&mut self.connection, action)?;
        self.finish(f)
    }

    /// Always opens a new outermost transaction; errors via
    /// [`TransactionManager::push_manual`]'s sibling check is not applied
    /// here, matching `push_transaction`'s unconditional push (§4.6).
    pub fn transaction<T>(&mut self, mode: impl Into<CompactString>, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let action = self.manager.push_transaction(mode.into());
        run_frame_action(&mut self.connection, action)?;
        self.finish(f)
    }

    /// Always opens a nested savepoint, regardless of whether a transaction
    /// is already open (§4.6).
    pub fn savepoint<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let action = self.manager.push_savepoint();
        run_frame_action(&mut self.connection, action)?;
        self.finish(f)
    }

    /// Disables autocommit for the closure's duration; rejected while a
    /// transaction or savepoint is already open (§4.6).
    pub fn manual<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let action = self.manager.push_manual()?;
        run_frame_action(&mut self.connection, action)?;
        self.finish(f)
    }

    fn finish<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match f(self) {
            Ok(value) => {
                let action = self.manager.pop_commit()?;
                run_frame_action(&mut self.connection, action)?;
                Ok(value)
            }
            Err(err) => {
                let action = self.manager.pop_rollback()?;
                run_frame_action(&mut self.connection, action)?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::test_support::MockConnection;

    #[test]
    fn atomic_opens_transaction_then_savepoints() {
        let mut mgr = TransactionManager::new();
        assert!(matches!(mgr.push_atomic(), FrameAction::Begin(_)));
        assert!(matches!(mgr.push_atomic(), FrameAction::Savepoint(_)));
        assert_eq!(mgr.depth(), 2);
    }

    #[test]
    fn commit_then_rollback_pop_in_lifo_order() {
        let mut mgr = TransactionManager::new();
        mgr.push_transaction("".into());
        mgr.push_savepoint();
        assert!(matches!(
            mgr.pop_rollback().unwrap(),
            FrameAction::RollbackToSavepoint(_)
        ));
        assert!(matches!(mgr.pop_commit().unwrap(), FrameAction::Commit));
        assert_eq!(mgr.depth(), 0);
    }

    #[test]
    fn pop_on_empty_stack_is_corrupted_error() {
        let mut mgr = TransactionManager::new();
        assert!(matches!(
            mgr.pop_commit(),
            Err(QuarryError::TransactionStackCorrupted)
        ));
    }

    #[test]
    fn manual_rejected_inside_open_transaction() {
        let mut mgr = TransactionManager::new();
        mgr.push_transaction("".into());
        assert!(matches!(
            mgr.push_manual(),
            Err(QuarryError::TransactionStackCorrupted)
        ));
    }

    #[test]
    fn atomic_commits_on_ok() {
        let mut db = Database::new(MockConnection::new());
        let result = db.atomic(|_tx| Ok::<_, QuarryError>(42));
        assert_eq!(result.unwrap(), 42);
        assert_eq!(db.connection().statements(), vec!["BEGIN", "COMMIT"]);
        assert_eq!(db.manager().depth(), 0);
    }

    #[test]
    fn atomic_rolls_back_on_err() {
        let mut db = Database::new(MockConnection::new());
        let result = db.atomic(|_tx| Err::<(), _>(QuarryError::Database("boom".into())));
        assert!(result.is_err());
        assert_eq!(db.connection().statements(), vec!["BEGIN", "ROLLBACK"]);
        assert_eq!(db.manager().depth(), 0);
    }

    /// A nested `atomic` that fails rolls back to its own savepoint only;
    /// the outer transaction stays open and still commits (§4.6/§9's
    /// nested-atomic-rollback scenario).
    #[test]
    fn nested_atomic_rollback_is_scoped_to_its_own_savepoint() {
        let mut db = Database::new(MockConnection::new());
        let outer = db.atomic(|tx| {
            let inner = tx.atomic(|_tx| Err::<(), _>(QuarryError::Database("boom".into())));
            assert!(inner.is_err());
            Ok::<_, QuarryError>(())
        });
        assert!(outer.is_ok());
        let statements = db.connection().statements();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], "BEGIN");
        assert!(statements[1].starts_with("SAVEPOINT s"));
        let savepoint_name = statements[1].trim_start_matches("SAVEPOINT ").to_string();
        assert_eq!(statements[2], format!("ROLLBACK TO SAVEPOINT {savepoint_name}"));
        assert_eq!(statements[3], "COMMIT");
    }

    #[test]
    fn manual_disables_autocommit_then_commits() {
        let mut db = Database::new(MockConnection::new());
        db.manual(|_tx| Ok::<_, QuarryError>(())).unwrap();
        assert_eq!(db.connection().statements(), vec!["BEGIN", "COMMIT"]);
    }
}
