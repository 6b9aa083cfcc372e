use crate::driver::{DriverRef, Query, QueryOutput};
use crate::errors::EnlistResult;
use crate::transaction::Transaction;
use std::sync::Arc;
use uuid::Uuid;

/// A handle to one physical database.
///
/// # Purpose
/// `Connection` is what the coordination layer holds instead of a raw driver:
/// an identity-bearing wrapper that every model, binding, and transaction
/// derived from the same database shares. The layer never creates database
/// connections itself; the driver behind this handle is supplied by the
/// data-access layer.
///
/// # Characteristics
/// - **Identity-Comparable**: Two handles are the same connection iff they
///   share the same inner state; [`Connection::same_connection`] checks
///   pointer identity, not structural equality
/// - **Cheap to Clone**: Clones share the inner state through `Arc`
/// - **Non-Transactional Execution**: [`Connection::execute`] runs a query
///   directly against the base connection, outside any transaction
/// - **Transaction Source**: [`Connection::begin_transaction`] opens a
///   physical transaction on this connection
///
/// # Usage
/// ```rust,ignore
/// use enlist::driver::MemoryDriver;
/// use enlist::Connection;
/// use std::sync::Arc;
///
/// let connection = Connection::new(Arc::new(MemoryDriver::new()));
/// let clone = connection.clone();
/// assert!(connection.same_connection(&clone));
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Creates a connection over a driver supplied by the data-access layer.
    pub fn new(driver: DriverRef) -> Connection {
        Connection {
            inner: Arc::new(ConnectionInner {
                id: Uuid::new_v4().to_string(),
                driver,
            }),
        }
    }

    /// Gets the connection ID.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Returns `true` when both handles refer to the same underlying
    /// physical connection.
    pub fn same_connection(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Executes a query directly against the base connection, outside any
    /// transaction.
    pub async fn execute(&self, query: Query) -> EnlistResult<QueryOutput> {
        self.inner.driver.execute(None, query).await
    }

    /// Opens a physical transaction on this connection.
    ///
    /// The caller owns settlement: it must call
    /// [`Transaction::commit`](crate::Transaction::commit) or
    /// [`Transaction::rollback`](crate::Transaction::rollback) exactly once.
    pub async fn begin_transaction(&self) -> EnlistResult<Transaction> {
        crate::transaction::begin_transaction_on(self).await
    }

    pub(crate) fn driver(&self) -> &DriverRef {
        &self.inner.driver
    }
}

struct ConnectionInner {
    id: String,
    driver: DriverRef,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id()).finish()
    }
}
