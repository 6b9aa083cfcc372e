use super::Model;
use crate::context::ExecutionContext;
use crate::driver::{Query, QueryOutput};
use crate::errors::{EnlistError, EnlistResult, ErrorKind};
use crate::record::Record;
use std::sync::Arc;

/// Binds a model to an execution context.
///
/// The returned [`BoundModel`] exposes the model's query surface, with every
/// query routed through `context` instead of the model's home connection.
/// Binding to a [`Transaction`](crate::Transaction) makes the queries
/// transactional; binding to a [`Connection`](crate::Connection) is the
/// supported degenerate case where queries run directly, with no
/// transactional wrapping.
///
/// Binding is idempotent in effect: binding the same model to the same
/// context twice yields two bound models with identical routing.
pub fn bind(model: &dyn Model, context: &ExecutionContext) -> BoundModel {
    BoundModel {
        inner: Arc::new(BoundModelInner {
            relation: model.relation().to_string(),
            context: context.clone(),
        }),
    }
}

/// A model specialized to one execution context.
///
/// # Purpose
/// `BoundModel` is what the scoped runner hands to the unit-of-work closure
/// and what [`bind`] produces: the full query surface of a model, with every
/// operation resolving against the bound context's connection. All bound
/// models derived within one scope share the same transaction handle, so
/// their operations commit or roll back together.
///
/// # Characteristics
/// - **Context-Routed**: Every operation goes through the bound
///   [`ExecutionContext`]; transactional contexts apply their admission check
/// - **Cheap to Clone**: Clones share state through `Arc`
/// - **Entity-Producing**: Write operations return an [`Entity`] that carries
///   the same context, enabling chained binding from results
#[derive(Clone)]
pub struct BoundModel {
    inner: Arc<BoundModelInner>,
}

impl BoundModel {
    /// The relation this bound model addresses.
    pub fn relation(&self) -> &str {
        &self.inner.relation
    }

    /// The context this model is bound to.
    pub fn context(&self) -> &ExecutionContext {
        &self.inner.context
    }

    /// Inserts one record, returning the stored row as an [`Entity`] bound to
    /// the same context.
    pub async fn insert(&self, record: Record) -> EnlistResult<Entity> {
        let output = self
            .inner
            .context
            .execute(Query::Insert {
                table: self.inner.relation.clone(),
                record,
            })
            .await?;
        let row = Self::expect_row(output)?;
        Ok(Entity::new(row, self.inner.context.clone()))
    }

    /// Returns all rows of the relation visible to the bound context, in
    /// insertion order.
    pub async fn find_all(&self) -> EnlistResult<Vec<Record>> {
        let output = self
            .inner
            .context
            .execute(Query::FindAll {
                table: self.inner.relation.clone(),
            })
            .await?;
        match output {
            QueryOutput::Rows(rows) => Ok(rows),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Counts the rows of the relation visible to the bound context.
    pub async fn count(&self) -> EnlistResult<u64> {
        let output = self
            .inner
            .context
            .execute(Query::Count {
                table: self.inner.relation.clone(),
            })
            .await?;
        match output {
            QueryOutput::Count(count) => Ok(count),
            other => Err(Self::unexpected(other)),
        }
    }

    /// Removes all rows of the relation through the bound context.
    pub async fn clear(&self) -> EnlistResult<()> {
        self.inner
            .context
            .execute(Query::DeleteAll {
                table: self.inner.relation.clone(),
            })
            .await?;
        Ok(())
    }

    fn expect_row(output: QueryOutput) -> EnlistResult<Record> {
        match output {
            QueryOutput::Row(record) => Ok(record),
            other => Err(Self::unexpected(other)),
        }
    }

    fn unexpected(output: QueryOutput) -> EnlistError {
        EnlistError::new(
            &format!("Driver returned an unexpected output shape: {:?}", output),
            ErrorKind::Internal,
        )
    }
}

impl std::fmt::Debug for BoundModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundModel")
            .field("relation", &self.inner.relation)
            .field("transactional", &self.inner.context.is_transactional())
            .finish()
    }
}

struct BoundModelInner {
    relation: String,
    context: ExecutionContext,
}

/// A row produced through a bound model, carrying its execution context.
///
/// # Purpose
/// The result of a write is more than the stored record: it remembers which
/// context produced it. The two accessors [`Entity::transaction`] and
/// [`Entity::connection`] are equivalent; both return the context the entity
/// was produced under, and that context can be handed straight back to
/// [`bind`] to derive further bindings without holding the original handle
/// separately.
#[derive(Clone, Debug)]
pub struct Entity {
    record: Record,
    context: ExecutionContext,
}

impl Entity {
    pub(crate) fn new(record: Record, context: ExecutionContext) -> Entity {
        Entity { record, context }
    }

    /// The stored row.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The context this entity was produced under. Further bindable.
    pub fn transaction(&self) -> ExecutionContext {
        self.context.clone()
    }

    /// Equivalent to [`Entity::transaction`]; named for the degenerate case
    /// where the entity was produced outside any transaction.
    pub fn connection(&self) -> ExecutionContext {
        self.context.clone()
    }
}
