//! The connection-provider seam.
//!
//! The coordination layer never talks to a database directly; it drives a
//! [`Driver`] implementation supplied by the data-access layer. A driver
//! knows how to begin, commit, and roll back a physical transaction and how
//! to execute a [`Query`] either on the base connection or inside an open
//! transaction identified by a [`TxToken`].
//!
//! The crate ships one implementation, the in-memory driver in [`memory`],
//! suitable for tests and temporary data.

pub mod memory;
mod query;

pub use memory::MemoryDriver;
pub use query::{Query, QueryOutput};

use crate::errors::EnlistResult;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Shared reference to a driver implementation.
pub type DriverRef = Arc<dyn Driver>;

/// Identifies one open driver-level transaction.
///
/// Tokens are allocated by [`Driver::begin`] and stay opaque to the
/// coordination layer; it only threads them back into `commit`, `rollback`,
/// and transactional `execute` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxToken(u64);

impl TxToken {
    pub fn new(value: u64) -> TxToken {
        TxToken(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for TxToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// Capability contract of the external connection provider.
///
/// # Purpose
/// Everything the coordination layer needs from a database: transaction
/// demarcation and query execution. Implementations must be safe to share
/// across tasks; the layer calls them through an `Arc`.
///
/// # Characteristics
/// - **Transaction demarcation**: `begin` opens a physical transaction and
///   returns its token; `commit`/`rollback` settle it. A settled token is
///   dead and must be refused afterwards.
/// - **Scoped execution**: `execute` with `Some(token)` runs inside that
///   transaction; with `None` it runs directly against the base connection.
/// - **No policy**: retry, pooling, and dialect concerns stay outside; the
///   driver reports failures and the coordination layer decides what they
///   mean.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Begins a physical transaction and returns its token.
    async fn begin(&self) -> EnlistResult<TxToken>;

    /// Commits the transaction identified by `token`.
    async fn commit(&self, token: TxToken) -> EnlistResult<()>;

    /// Rolls back the transaction identified by `token`.
    async fn rollback(&self, token: TxToken) -> EnlistResult<()>;

    /// Executes a query, inside the given transaction when `token` is
    /// `Some`, otherwise directly against the base connection.
    async fn execute(&self, token: Option<TxToken>, query: Query) -> EnlistResult<QueryOutput>;
}
