//! The external driver/connection contract (§1 "out of scope: concrete
//! driver bindings... interfaces only"). Concrete SQLite/Postgres/MySQL
//! bindings live outside this crate; this module only defines the seam.

use std::collections::HashMap;

use compact_str::CompactString;

use crate::cursor::RawRow;
use crate::error::Result;
use crate::value::Value;

/// Per-thread vs. shared connection-state mode (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadMode {
    /// Each thread owns its own connection and frame stack.
    PerThread,
    /// A single connection/frame stack shared across threads, guarded by a
    /// caller-provided lock; the toolkit itself does not serialize access.
    Shared,
}

/// Connection-time configuration (§5 "Resource Model", ambient config).
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub thread_mode: ThreadMode,
    pub busy_timeout_ms: Option<u64>,
    pub autocommit: bool,
    pub options: HashMap<String, String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            thread_mode: ThreadMode::PerThread,
            busy_timeout_ms: None,
            autocommit: true,
            options: HashMap::new(),
        }
    }
}

/// The execution contract a concrete driver must satisfy. Blocking and
/// synchronous by design (§5): every call runs on the caller's thread.
pub trait Connection {
    /// Runs `sql` with `params` bound in order; returns the raw rows plus
    /// their column descriptions (pre-qualifier-stripped names), and, for
    /// an INSERT without RETURNING, the driver-reported last-row-id.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<(Vec<CompactString>, Vec<RawRow>, Option<i64>)>;

    /// SQLite-style connection pragma passthrough (§9 supplemented
    /// feature); illustrative only, no concrete pragma catalog is defined
    /// here.
    fn pragma(&mut self, _key: &str, _value: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()>;
}

/// Owns connect/close under a mutex (§5: "The Database owns a mutex
/// protecting connect/close/state reset").
pub trait Driver {
    type Conn: Connection;

    fn connect(&self, options: &ConnectOptions) -> Result<Self::Conn>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! An in-memory fake driver used across this crate's own tests so
    //! join/prefetch/transaction logic can be exercised without a real
    //! SQLite/Postgres/MySQL binding.

    use std::cell::RefCell;

    use super::*;

    /// Scripted response for one `execute` call.
    #[derive(Debug, Clone, Default)]
    pub struct MockResponse {
        pub columns: Vec<CompactString>,
        pub rows: Vec<RawRow>,
        pub last_insert_id: Option<i64>,
    }

    /// Records every statement it was asked to run and replays scripted
    /// responses in order.
    #[derive(Debug, Default)]
    pub struct MockConnection {
        pub executed: RefCell<Vec<(String, Vec<Value>)>>,
        responses: RefCell<std::collections::VecDeque<MockResponse>>,
    }

    impl MockConnection {
        pub fn new() -> Self {
            MockConnection::default()
        }

        pub fn push_response(&self, response: MockResponse) {
            self.responses.borrow_mut().push_back(response);
        }

        pub fn statements(&self) -> Vec<String> {
            self.executed
                .borrow()
                .iter()
                .map(|(sql, _)| sql.clone())
                .collect()
        }
    }

    impl Connection for MockConnection {
        fn execute(
            &mut self,
            sql: &str,
            params: &[Value],
        ) -> Result<(Vec<CompactString>, Vec<RawRow>, Option<i64>)> {
            crate::quarry_trace_execute!(sql, params.len());
            self.executed
                .borrow_mut()
                .push((sql.to_string(), params.to_vec()));
            let response = self.responses.borrow_mut().pop_front().unwrap_or_default();
            Ok((response.columns, response.rows, response.last_insert_id))
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockDriver;

    impl Driver for MockDriver {
        type Conn = MockConnection;

        fn connect(&self, _options: &ConnectOptions) -> Result<Self::Conn> {
            Ok(MockConnection::new())
        }
    }
}
