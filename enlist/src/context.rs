use crate::connection::Connection;
use crate::driver::{Query, QueryOutput};
use crate::errors::EnlistResult;
use crate::transaction::Transaction;

/// Where a bound model's queries execute: a raw connection or an open
/// transaction.
///
/// # Purpose
/// Binding a model to a transaction and binding it to a bare connection are
/// the same operation with a different target; this sum type lets one binding
/// code path serve both. The `Connection` variant is the degenerate,
/// non-transactional case: queries route directly against the connection with
/// no transactional wrapping.
///
/// # Characteristics
/// - **Uniform Execution**: [`ExecutionContext::execute`] dispatches to the
///   underlying connection or transaction
/// - **Re-Bindable**: Any context, including one recovered from an
///   [`Entity`](crate::model::Entity), can be handed back to
///   [`bind`](crate::model::bind) to derive further bindings
/// - **Identity-Aware**: [`ExecutionContext::same_connection`] compares the
///   underlying physical connections
#[derive(Clone, Debug)]
pub enum ExecutionContext {
    /// Direct execution against the base connection, outside any transaction.
    Connection(Connection),
    /// Execution inside an open transaction.
    Transaction(Transaction),
}

impl ExecutionContext {
    /// The underlying physical connection of this context.
    pub fn connection(&self) -> Connection {
        match self {
            ExecutionContext::Connection(connection) => connection.clone(),
            ExecutionContext::Transaction(transaction) => transaction.connection(),
        }
    }

    /// Returns `true` when both contexts run against the same underlying
    /// physical connection.
    pub fn same_connection(&self, other: &ExecutionContext) -> bool {
        self.connection().same_connection(&other.connection())
    }

    /// Returns `true` for transactional contexts.
    pub fn is_transactional(&self) -> bool {
        matches!(self, ExecutionContext::Transaction(_))
    }

    /// The transaction handle, when this context is transactional.
    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            ExecutionContext::Transaction(transaction) => Some(transaction),
            ExecutionContext::Connection(_) => None,
        }
    }

    /// Executes a query through this context.
    ///
    /// Transactional contexts pass through the transaction's admission check;
    /// connection contexts go straight to the base connection.
    pub async fn execute(&self, query: Query) -> EnlistResult<QueryOutput> {
        match self {
            ExecutionContext::Connection(connection) => connection.execute(query).await,
            ExecutionContext::Transaction(transaction) => transaction.execute(query).await,
        }
    }
}

impl From<Connection> for ExecutionContext {
    fn from(connection: Connection) -> Self {
        ExecutionContext::Connection(connection)
    }
}
