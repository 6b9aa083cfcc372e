//! Models and transaction binding.
//!
//! A model is anything that names a relation and knows its home connection.
//! [`bind`] specializes a model to an [`ExecutionContext`]
//! (a connection or an open transaction), producing a [`BoundModel`] whose
//! queries all route through that context. Entities returned by bound
//! operations carry the context with them, so further bindings can be derived
//! from a result without holding the original handle.
//!
//! [`ExecutionContext`]: crate::context::ExecutionContext

mod binding;
mod table;

pub use binding::{bind, BoundModel, Entity};
pub use table::Table;

use crate::connection::Connection;

/// Capability contract of a data-model value.
///
/// # Purpose
/// The coordination layer needs exactly two things from a model: the relation
/// its queries address and the connection it is homed on. The home connection
/// drives input validation (all models of one scope must share one physical
/// connection) and serves as the degenerate binding target when no
/// transaction is open.
///
/// Implementing this trait is what makes a value usable with
/// [`transaction`](crate::transaction::transaction) and
/// [`begin_transaction`](crate::transaction::begin_transaction); there is no
/// runtime shape check.
pub trait Model: Send + Sync {
    /// The relation this model's queries address.
    fn relation(&self) -> &str;

    /// The connection this model is associated with absent any binding.
    fn home_connection(&self) -> Connection;
}
