use super::{Driver, Query, QueryOutput, TxToken};
use crate::errors::{EnlistError, EnlistResult, ErrorKind};
use crate::record::Record;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory implementation of the [`Driver`] seam.
///
/// # Purpose
/// `MemoryDriver` provides a complete in-memory database driver suitable for
/// testing, temporary data, and scenarios where persistence is not required.
/// Committed rows live in concurrent tables; each open transaction accumulates
/// its writes in a private overlay that is applied on commit and discarded on
/// rollback.
///
/// # Characteristics
/// - **Thread-Safe**: Committed tables use a concurrent map; overlays are
///   guarded by a single mutex
/// - **Isolated**: A transaction reads its own pending writes; other callers
///   see only committed rows until the transaction commits
/// - **Ordered**: Rows are kept in insertion order, both in overlays and in
///   committed tables
/// - **Observable**: Diagnostic counters expose how many transactions were
///   begun, how many are still open, and how many queries reached the driver
/// - **No Persistence**: All data is lost when the driver is dropped
///
/// # Usage
/// ```rust,ignore
/// use enlist::driver::MemoryDriver;
/// use enlist::Connection;
/// use std::sync::Arc;
///
/// let driver = MemoryDriver::new();
/// let connection = Connection::new(Arc::new(driver.clone()));
/// ```
#[derive(Clone)]
pub struct MemoryDriver {
    inner: Arc<MemoryDriverInner>,
}

impl MemoryDriver {
    /// Creates a new, empty in-memory driver.
    pub fn new() -> MemoryDriver {
        MemoryDriver {
            inner: Arc::new(MemoryDriverInner::new()),
        }
    }

    /// Number of transactions begun since creation.
    pub fn transactions_begun(&self) -> u64 {
        self.inner.transactions_begun.load(Ordering::SeqCst)
    }

    /// Number of transactions currently open (begun but not yet settled).
    pub fn open_transactions(&self) -> usize {
        self.inner.overlays.lock().len()
    }

    /// Number of queries that reached the driver since creation.
    pub fn executed_queries(&self) -> u64 {
        self.inner.executed_queries.load(Ordering::SeqCst)
    }

    /// Number of committed rows in a table. Missing tables count as zero.
    pub fn committed_rows(&self, table: &str) -> usize {
        self.inner
            .tables
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("tables", &self.inner.tables.len())
            .field("open_transactions", &self.open_transactions())
            .field("transactions_begun", &self.transactions_begun())
            .field("executed_queries", &self.executed_queries())
            .finish()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn begin(&self) -> EnlistResult<TxToken> {
        Ok(self.inner.begin())
    }

    async fn commit(&self, token: TxToken) -> EnlistResult<()> {
        self.inner.commit(token)
    }

    async fn rollback(&self, token: TxToken) -> EnlistResult<()> {
        self.inner.rollback(token)
    }

    async fn execute(&self, token: Option<TxToken>, query: Query) -> EnlistResult<QueryOutput> {
        self.inner.execute(token, query)
    }
}

/// One write recorded inside an open transaction, replayed on commit.
#[derive(Debug, Clone)]
enum OverlayOp {
    Insert(String, Record),
    Clear(String),
}

struct MemoryDriverInner {
    tables: DashMap<String, Vec<Record>>,
    overlays: Mutex<HashMap<TxToken, Vec<OverlayOp>>>,
    next_token: AtomicU64,
    transactions_begun: AtomicU64,
    executed_queries: AtomicU64,
}

impl MemoryDriverInner {
    fn new() -> MemoryDriverInner {
        MemoryDriverInner {
            tables: DashMap::new(),
            overlays: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            transactions_begun: AtomicU64::new(0),
            executed_queries: AtomicU64::new(0),
        }
    }

    fn begin(&self) -> TxToken {
        let token = TxToken::new(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.overlays.lock().insert(token, Vec::new());
        self.transactions_begun.fetch_add(1, Ordering::SeqCst);
        token
    }

    fn commit(&self, token: TxToken) -> EnlistResult<()> {
        let ops = self
            .overlays
            .lock()
            .remove(&token)
            .ok_or_else(|| Self::dead_token(token))?;

        // Replay in submission order so interleaved inserts and clears land
        // exactly as the transaction issued them.
        for op in ops {
            match op {
                OverlayOp::Insert(table, record) => {
                    self.tables.entry(table).or_default().push(record);
                }
                OverlayOp::Clear(table) => {
                    if let Some(mut rows) = self.tables.get_mut(&table) {
                        rows.clear();
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&self, token: TxToken) -> EnlistResult<()> {
        self.overlays
            .lock()
            .remove(&token)
            .map(|_| ())
            .ok_or_else(|| Self::dead_token(token))
    }

    fn execute(&self, token: Option<TxToken>, query: Query) -> EnlistResult<QueryOutput> {
        self.executed_queries.fetch_add(1, Ordering::SeqCst);

        match token {
            Some(token) => self.execute_in_transaction(token, query),
            None => Ok(self.execute_direct(query)),
        }
    }

    fn execute_direct(&self, query: Query) -> QueryOutput {
        match query {
            Query::Insert { table, record } => {
                self.tables.entry(table).or_default().push(record.clone());
                QueryOutput::Row(record)
            }
            Query::FindAll { table } => QueryOutput::Rows(self.committed(&table)),
            Query::Count { table } => QueryOutput::Count(self.committed(&table).len() as u64),
            Query::DeleteAll { table } => {
                if let Some(mut rows) = self.tables.get_mut(&table) {
                    rows.clear();
                }
                QueryOutput::Done
            }
        }
    }

    fn execute_in_transaction(&self, token: TxToken, query: Query) -> EnlistResult<QueryOutput> {
        let mut overlays = self.overlays.lock();
        let ops = overlays
            .get_mut(&token)
            .ok_or_else(|| Self::dead_token(token))?;

        let output = match query {
            Query::Insert { table, record } => {
                ops.push(OverlayOp::Insert(table, record.clone()));
                QueryOutput::Row(record)
            }
            Query::FindAll { table } => {
                QueryOutput::Rows(Self::visible(&self.tables, ops, &table))
            }
            Query::Count { table } => {
                QueryOutput::Count(Self::visible(&self.tables, ops, &table).len() as u64)
            }
            Query::DeleteAll { table } => {
                ops.push(OverlayOp::Clear(table));
                QueryOutput::Done
            }
        };
        Ok(output)
    }

    /// Rows a transaction sees for `table`: committed rows with the
    /// transaction's own pending operations replayed on top.
    fn visible(
        tables: &DashMap<String, Vec<Record>>,
        ops: &[OverlayOp],
        table: &str,
    ) -> Vec<Record> {
        let mut rows = tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default();

        for op in ops {
            match op {
                OverlayOp::Insert(t, record) if t == table => rows.push(record.clone()),
                OverlayOp::Clear(t) if t == table => rows.clear(),
                _ => {}
            }
        }
        rows
    }

    fn committed(&self, table: &str) -> Vec<Record> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn dead_token(token: TxToken) -> EnlistError {
        EnlistError::new(
            &format!("Transaction {} is not open in this driver", token),
            ErrorKind::ClosedTransaction,
        )
    }
}
