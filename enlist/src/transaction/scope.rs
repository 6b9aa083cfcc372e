use super::handle::{SettleAction, Transaction};
use crate::connection::Connection;
use crate::errors::{EnlistError, EnlistResult, ErrorKind};
use crate::model::{bind, BoundModel, Model};
use crate::report;
use std::future::Future;

/// Opens a transaction scope over one or more models.
///
/// # Validation
/// Performed synchronously, before any I/O:
/// * an empty model sequence fails with [`ErrorKind::InvalidInput`];
/// * models whose home connections are not the identical physical connection
///   fail with [`ErrorKind::InvalidInput`], so one scope can never silently
///   span two databases.
///
/// # Returns
/// * `Ok((transaction, bound))` - One physical transaction in state `Open`,
///   plus the models bound to it in input order. The caller owns settlement
///   and must commit or roll back exactly once.
/// * `Err` with [`ErrorKind::TransactionStart`] - The driver-level begin call
///   failed; no handle is returned.
pub async fn begin_transaction(
    models: &[&dyn Model],
) -> EnlistResult<(Transaction, Vec<BoundModel>)> {
    let home = validate(models)?;
    let transaction = open(&home, false).await?;
    let bound = bind_all(models, &transaction);
    Ok((transaction, bound))
}

/// Opens a transaction scope directly on a connection.
///
/// The caller owns settlement: it must call [`Transaction::commit`] or
/// [`Transaction::rollback`] exactly once.
pub async fn begin_transaction_on(connection: &Connection) -> EnlistResult<Transaction> {
    open(connection, false).await
}

/// Runs a unit of work inside an implicit transaction scope.
///
/// # Purpose
/// The closure receives the models bound to one freshly opened transaction,
/// in input order. The transaction's outcome follows the closure's result:
/// `Ok` commits, `Err` rolls back. The caller never touches the handle.
///
/// # Behavior
/// * Validation failures short-circuit with [`ErrorKind::InvalidInput`]; the
///   closure is never invoked and no transaction is opened.
/// * On `Ok(value)`, the scope commits. If the commit itself fails, the call
///   returns the commit error; the closure's success does not mask it.
/// * On `Err(error)`, the scope rolls back and returns `error`. A rollback
///   failure is suppressed from the result (logged and published to the
///   [`report`] registry), since the closure's error is the actionable cause.
/// * Settlement waits for every operation admitted through the handle to
///   finish, and operations racing the settlement are refused with
///   [`ErrorKind::ClosedTransaction`] before they reach the database.
/// * A closure that issues no query still opens and commits a transaction;
///   an empty scope is valid and is not optimized away.
///
/// # Usage
/// ```rust,ignore
/// let value = enlist::transaction(&[&users, &accounts], |bound| async move {
///     bound[0].insert(record! { name: "Alice" }).await?;
///     bound[1].insert(record! { owner: "Alice" }).await?;
///     Ok(42)
/// })
/// .await?;
/// ```
pub async fn transaction<F, Fut, R>(models: &[&dyn Model], work: F) -> EnlistResult<R>
where
    F: FnOnce(Vec<BoundModel>) -> Fut,
    Fut: Future<Output = EnlistResult<R>>,
{
    let home = validate(models)?;
    let transaction = open(&home, true).await?;
    let bound = bind_all(models, &transaction);
    run_scoped(transaction, work(bound)).await
}

/// Runs a unit of work inside an implicit transaction scope opened directly
/// on a connection.
///
/// The closure receives the scope's [`Transaction`] handle for binding and
/// querying, but settlement stays with the scope: explicit commit/rollback on
/// the handle fails with [`ErrorKind::AlreadySettled`].
pub async fn transaction_on<F, Fut, R>(connection: &Connection, work: F) -> EnlistResult<R>
where
    F: FnOnce(Transaction) -> Fut,
    Fut: Future<Output = EnlistResult<R>>,
{
    let transaction = open(connection, true).await?;
    let fut = work(transaction.clone());
    run_scoped(transaction, fut).await
}

/// Synchronous input validation: non-empty, one shared home connection.
fn validate(models: &[&dyn Model]) -> EnlistResult<Connection> {
    let first = models.first().ok_or_else(|| {
        EnlistError::new(
            "At least one model is required to open a transaction",
            ErrorKind::InvalidInput,
        )
    })?;

    let home = first.home_connection();
    for model in &models[1..] {
        if !home.same_connection(&model.home_connection()) {
            return Err(EnlistError::new(
                &format!(
                    "Model '{}' is homed on a different connection; all models of one \
                     transaction must share the same physical connection",
                    model.relation()
                ),
                ErrorKind::InvalidInput,
            ));
        }
    }
    Ok(home)
}

async fn open(connection: &Connection, scoped: bool) -> EnlistResult<Transaction> {
    let token = connection.driver().begin().await.map_err(|cause| {
        EnlistError::new_with_cause(
            "Failed to begin a transaction on the underlying connection",
            ErrorKind::TransactionStart,
            cause,
        )
    })?;
    Ok(Transaction::new(connection.clone(), token, scoped))
}

fn bind_all(models: &[&dyn Model], transaction: &Transaction) -> Vec<BoundModel> {
    let context = transaction.clone().into();
    models.iter().map(|model| bind(*model, &context)).collect()
}

/// The single exit action: commit on `Ok`, rollback on `Err`.
async fn run_scoped<R>(
    transaction: Transaction,
    work: impl Future<Output = EnlistResult<R>>,
) -> EnlistResult<R> {
    match work.await {
        Ok(value) => {
            transaction.settle(SettleAction::Commit).await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = transaction.settle(SettleAction::Rollback).await {
                // The unit-of-work error stays the caller-visible result;
                // the rollback failure goes to the log and the reporters.
                log::warn!(
                    "Rollback of transaction {} failed after unit-of-work error: {}",
                    transaction.id(),
                    rollback_error
                );
                report::publish(&rollback_error);
            }
            Err(error)
        }
    }
}
