//! Transaction handles and scopes.
//!
//! [`begin_transaction`]/[`begin_transaction_on`] open a scope explicitly and
//! leave settlement to the caller; [`transaction`]/[`transaction_on`] run a
//! unit-of-work closure and settle the scope themselves, committing on `Ok`
//! and rolling back on `Err`.

mod handle;
mod scope;

pub use handle::{OperationPermit, Transaction, TransactionState};
pub use scope::{begin_transaction, begin_transaction_on, transaction, transaction_on};
