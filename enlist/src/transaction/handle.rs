use crate::connection::Connection;
use crate::driver::{Query, QueryOutput, TxToken};
use crate::errors::{EnlistError, EnlistResult, ErrorKind};
use crate::model::{bind, BoundModel, Model};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// States a [`Transaction`] moves through.
///
/// A handle starts `Open`, enters `Committing` or `RollingBack` the moment
/// settlement is requested, and ends `Closed` once the driver call has
/// finished. Queries are admitted only while the handle is `Open`; from the
/// first settlement request onward, nothing new reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// The transaction is open and admits queries.
    Open,
    /// Commit has been requested; no new queries are admitted.
    Committing,
    /// Rollback has been requested; no new queries are admitted.
    RollingBack,
    /// The transaction has settled. Terminal.
    Closed,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Open => write!(f, "Open"),
            TransactionState::Committing => write!(f, "Committing"),
            TransactionState::RollingBack => write!(f, "RollingBack"),
            TransactionState::Closed => write!(f, "Closed"),
        }
    }
}

/// The settlement action requested on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettleAction {
    Commit,
    Rollback,
}

/// A handle to one open physical transaction.
///
/// # Purpose
/// `Transaction` is the single shared handle every binding of one scope routes
/// its queries through. It owns the driver-level token, enforces the state
/// machine above, and guarantees that settlement happens exactly once and only
/// after every admitted query has finished.
///
/// # Characteristics
/// - **Unique ID**: Each transaction has a unique UUID identifier
/// - **Shared**: Clones share state through `Arc`; bindings and entities hold
///   clones of the same handle
/// - **Admission-Gated**: Every query passes a synchronous admission check and
///   holds an [`OperationPermit`] while it is in flight; a handle that has
///   left `Open` refuses admission with a closed-transaction error
/// - **Quiescent Settlement**: Commit and rollback first shut admission, then
///   wait for outstanding permits to drain, then issue the driver call, so
///   the driver sees a quiet transaction
/// - **Settle-Once**: A second commit or rollback, in any combination, fails
///   with an already-settled error
/// - **Scope-Owned Settlement**: Handles created by the scoped runner refuse
///   explicit commit/rollback; the runner settles them itself
///
/// # Usage
/// ```rust,ignore
/// let tx = connection.begin_transaction().await?;
/// let users = tx.bind(&users_table);
/// users.insert(record! { name: "Alice" }).await?;
/// tx.commit().await?;
/// ```
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl Transaction {
    pub(crate) fn new(connection: Connection, token: TxToken, scoped: bool) -> Transaction {
        Transaction {
            inner: Arc::new(TransactionInner {
                id: Uuid::new_v4().to_string(),
                connection,
                token,
                scoped,
                state: Mutex::new(TransactionState::Open),
                in_flight: AtomicUsize::new(0),
                quiescent: Notify::new(),
            }),
        }
    }

    /// Gets the transaction ID.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Gets the current transaction state.
    pub fn state(&self) -> TransactionState {
        *self.inner.state.lock()
    }

    /// Returns `true` while the handle still admits queries.
    pub fn is_open(&self) -> bool {
        self.state() == TransactionState::Open
    }

    /// Returns `true` once the handle has settled.
    pub fn is_settled(&self) -> bool {
        self.state() == TransactionState::Closed
    }

    /// The connection this transaction runs on.
    pub fn connection(&self) -> Connection {
        self.inner.connection.clone()
    }

    /// Binds a model to this transaction. Equivalent to
    /// [`bind`](crate::model::bind) with this handle as the context.
    pub fn bind(&self, model: &dyn Model) -> BoundModel {
        bind(model, &self.clone().into())
    }

    /// Executes a query inside this transaction.
    ///
    /// Admission is checked synchronously before the query is sent: if the
    /// handle has left `Open` (settlement requested or completed), the query
    /// fails with [`ErrorKind::ClosedTransaction`] and never reaches the
    /// database.
    pub async fn execute(&self, query: Query) -> EnlistResult<QueryOutput> {
        let _permit = self.admit()?;
        self.inner
            .connection
            .driver()
            .execute(Some(self.inner.token), query)
            .await
    }

    /// Commits the transaction.
    ///
    /// # Returns
    /// * `Ok(())` - All writes of this transaction are durable
    /// * `Err` with [`ErrorKind::AlreadySettled`] - Settlement was already
    ///   requested, or this handle belongs to a scoped runner
    /// * `Err` with [`ErrorKind::Commit`] - The driver-level commit failed;
    ///   the handle is `Closed` and no rollback is attempted
    pub async fn commit(&self) -> EnlistResult<()> {
        self.check_settlement_ownership()?;
        self.settle(SettleAction::Commit).await
    }

    /// Rolls back the transaction, discarding all of its writes.
    ///
    /// # Returns
    /// * `Ok(())` - The transaction was rolled back
    /// * `Err` with [`ErrorKind::AlreadySettled`] - Settlement was already
    ///   requested, or this handle belongs to a scoped runner
    /// * `Err` with [`ErrorKind::Rollback`] - The driver-level rollback failed
    pub async fn rollback(&self) -> EnlistResult<()> {
        self.check_settlement_ownership()?;
        self.settle(SettleAction::Rollback).await
    }

    /// Admits one operation, returning the permit that keeps settlement
    /// waiting until the operation finishes.
    pub(crate) fn admit(&self) -> EnlistResult<OperationPermit> {
        let state = self.inner.state.lock();
        if *state != TransactionState::Open {
            return Err(EnlistError::new(
                &format!(
                    "Transaction {} is {}; no further query may reach the database",
                    self.inner.id, *state
                ),
                ErrorKind::ClosedTransaction,
            ));
        }
        // Incremented under the state lock, so settlement cannot observe a
        // stale zero between the state check and the increment.
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(OperationPermit {
            inner: self.inner.clone(),
        })
    }

    /// Settles the handle: shuts admission, drains outstanding permits, then
    /// issues the driver-level commit or rollback.
    pub(crate) async fn settle(&self, action: SettleAction) -> EnlistResult<()> {
        {
            let mut state = self.inner.state.lock();
            if *state != TransactionState::Open {
                return Err(EnlistError::new(
                    &format!("Transaction {} has already settled", self.inner.id),
                    ErrorKind::AlreadySettled,
                ));
            }
            *state = match action {
                SettleAction::Commit => TransactionState::Committing,
                SettleAction::Rollback => TransactionState::RollingBack,
            };
        }

        self.await_quiescence().await;

        let driver = self.inner.connection.driver();
        let result = match action {
            SettleAction::Commit => driver.commit(self.inner.token).await,
            SettleAction::Rollback => driver.rollback(self.inner.token).await,
        };

        // Settlement is exactly-once: a failed driver call does not reopen
        // the handle.
        *self.inner.state.lock() = TransactionState::Closed;

        result.map_err(|cause| match action {
            SettleAction::Commit => EnlistError::new_with_cause(
                &format!("Failed to commit transaction {}", self.inner.id),
                ErrorKind::Commit,
                cause,
            ),
            SettleAction::Rollback => EnlistError::new_with_cause(
                &format!("Failed to roll back transaction {}", self.inner.id),
                ErrorKind::Rollback,
                cause,
            ),
        })
    }

    /// Waits until no admitted operation is still in flight. Admission is
    /// already shut by the time this runs, so the count can only fall.
    async fn await_quiescence(&self) {
        loop {
            let notified = self.inner.quiescent.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn check_settlement_ownership(&self) -> EnlistResult<()> {
        if self.inner.scoped {
            return Err(EnlistError::new(
                &format!(
                    "Transaction {} is settled by its scope; explicit commit/rollback is not allowed",
                    self.inner.id
                ),
                ErrorKind::AlreadySettled,
            ));
        }
        Ok(())
    }
}

impl From<Transaction> for crate::context::ExecutionContext {
    fn from(transaction: Transaction) -> Self {
        crate::context::ExecutionContext::Transaction(transaction)
    }
}

struct TransactionInner {
    id: String,
    connection: Connection,
    token: TxToken,
    scoped: bool,
    state: Mutex<TransactionState>,
    in_flight: AtomicUsize,
    quiescent: Notify,
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        // Last handle gone without settlement; the driver keeps the abandoned
        // transaction until it is cleaned up out of band.
        let state = *self.state.get_mut();
        if state == TransactionState::Open {
            log::warn!(
                "Transaction {} dropped while still open; it was never committed or rolled back",
                self.id
            );
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Read state once to avoid holding the lock across the formatter
        let state = self.state();
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("state", &state)
            .field("token", &self.inner.token)
            .field("in_flight", &self.inner.in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

/// RAII guard held by every admitted operation.
///
/// Settlement waits until all permits are dropped before the driver-level
/// commit or rollback is issued.
pub struct OperationPermit {
    inner: Arc<TransactionInner>,
}

impl std::fmt::Debug for OperationPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationPermit")
            .field("token", &self.inner.token)
            .finish()
    }
}

impl Drop for OperationPermit {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.quiescent.notify_waiters();
        }
    }
}
