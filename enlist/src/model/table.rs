use super::{bind, Entity, Model};
use crate::connection::Connection;
use crate::errors::EnlistResult;
use crate::record::Record;
use std::sync::Arc;

/// The stock [`Model`] implementation: a named relation homed on a
/// connection.
///
/// # Purpose
/// `Table` is the model most callers need: it names a relation and remembers
/// its home connection. Passed to the scoped runner it becomes a
/// [`BoundModel`](crate::model::BoundModel); used directly, its convenience
/// operations route through the degenerate connection binding, so bound and
/// unbound execution share one code path.
///
/// # Usage
/// ```rust,ignore
/// use enlist::{record, Connection, Table};
///
/// let users = Table::new("users", connection.clone());
/// users.insert(record! { name: "Alice" }).await?; // auto-committed
///
/// enlist::transaction(&[&users], |bound| async move {
///     bound[0].insert(record! { name: "Bob" }).await?; // transactional
///     Ok(())
/// })
/// .await?;
/// ```
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    /// Creates a model for the relation `name`, homed on `connection`.
    pub fn new(name: &str, connection: Connection) -> Table {
        Table {
            inner: Arc::new(TableInner {
                name: name.to_string(),
                connection,
            }),
        }
    }

    /// The relation name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Inserts one record outside any transaction.
    pub async fn insert(&self, record: Record) -> EnlistResult<Entity> {
        self.unbound().insert(record).await
    }

    /// Returns all committed rows, in insertion order.
    pub async fn find_all(&self) -> EnlistResult<Vec<Record>> {
        self.unbound().find_all().await
    }

    /// Counts the committed rows.
    pub async fn count(&self) -> EnlistResult<u64> {
        self.unbound().count().await
    }

    /// Removes all rows, outside any transaction.
    pub async fn clear(&self) -> EnlistResult<()> {
        self.unbound().clear().await
    }

    /// The degenerate binding to the home connection.
    fn unbound(&self) -> crate::model::BoundModel {
        bind(self, &self.inner.connection.clone().into())
    }
}

impl Model for Table {
    fn relation(&self) -> &str {
        &self.inner.name
    }

    fn home_connection(&self) -> Connection {
        self.inner.connection.clone()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.inner.name)
            .field("connection", &self.inner.connection.id())
            .finish()
    }
}

struct TableInner {
    name: String,
    connection: Connection,
}
