//! # Enlist - Async Transaction Coordination
//!
//! Enlist is a transaction-coordination layer that sits between application
//! code and a relational data-access layer. A caller runs a unit of work
//! against one or more models; enlist guarantees that every operation inside
//! that unit shares a single underlying database transaction, and that the
//! transaction commits or rolls back automatically based on whether the unit
//! of work succeeds.
//!
//! ## Key Features
//!
//! - **Scoped Transactions**: [`transaction`] runs an async closure inside an
//!   implicit scope with a single guaranteed exit action: commit on `Ok`,
//!   rollback on `Err`
//! - **Explicit Scopes**: [`begin_transaction`] opens a scope whose settlement
//!   the caller drives, with settle-once enforcement
//! - **Model Binding**: [`bind`] associates a model (and every entity it
//!   produces) with an open transaction, so queries participate without the
//!   caller threading a handle through every call
//! - **Fail-Fast After Settlement**: once settlement is requested, no further
//!   query on that handle reaches the database
//! - **Pluggable Drivers**: the connection provider is a trait; the crate
//!   ships an in-memory driver for tests and temporary data
//! - **Clean API**: PIMPL pattern provides stable, encapsulated handle types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enlist::driver::MemoryDriver;
//! use enlist::{record, Connection, Table};
//! use std::sync::Arc;
//!
//! # async fn example() -> enlist::errors::EnlistResult<()> {
//! let connection = Connection::new(Arc::new(MemoryDriver::new()));
//! let users = Table::new("users", connection.clone());
//! let accounts = Table::new("accounts", connection.clone());
//!
//! // Both inserts share one transaction; an Err would roll both back.
//! enlist::transaction(&[&users, &accounts], |bound| async move {
//!     bound[0].insert(record! { name: "Alice" }).await?;
//!     bound[1].insert(record! { owner: "Alice", balance: 100 }).await?;
//!     Ok(())
//! })
//! .await?;
//!
//! // Or drive the scope by hand.
//! let tx = connection.begin_transaction().await?;
//! tx.bind(&users).insert(record! { name: "Bob" }).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`connection`] - The identity-bearing connection handle
//! - [`context`] - The connection/transaction execution context
//! - [`driver`] - The connection-provider seam and the in-memory driver
//! - [`errors`] - Error types and result definitions
//! - [`model`] - The model capability, binding, and the stock table model
//! - [`record`] - The record payload and the `record!` macro
//! - [`report`] - Process-wide reporting for suppressed errors
//! - [`transaction`] - Transaction handles and scopes

pub mod connection;
pub mod context;
pub mod driver;
pub mod errors;
pub mod model;
pub mod record;
pub mod report;
pub mod transaction;

pub use connection::Connection;
pub use context::ExecutionContext;
pub use errors::{EnlistError, EnlistResult, ErrorKind};
pub use model::{bind, BoundModel, Entity, Model, Table};
pub use record::{Record, Value};
pub use transaction::{
    begin_transaction, begin_transaction_on, transaction, transaction_on, Transaction,
    TransactionState,
};
