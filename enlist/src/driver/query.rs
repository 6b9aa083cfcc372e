use crate::record::Record;
use std::fmt::{Display, Formatter};

/// A query handed to the driver.
///
/// The coordination layer does not build SQL; it describes the operation and
/// the relation it addresses, and the driver decides how to run it. This enum
/// is the interface boundary with the query-building layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Insert one record into a relation.
    Insert { table: String, record: Record },
    /// Return all records of a relation, in insertion order.
    FindAll { table: String },
    /// Count the records of a relation.
    Count { table: String },
    /// Remove all records of a relation.
    DeleteAll { table: String },
}

impl Query {
    /// The relation this query addresses.
    pub fn table(&self) -> &str {
        match self {
            Query::Insert { table, .. } => table,
            Query::FindAll { table } => table,
            Query::Count { table } => table,
            Query::DeleteAll { table } => table,
        }
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Insert { table, .. } => write!(f, "insert into {}", table),
            Query::FindAll { table } => write!(f, "find all from {}", table),
            Query::Count { table } => write!(f, "count {}", table),
            Query::DeleteAll { table } => write!(f, "delete all from {}", table),
        }
    }
}

/// The driver's answer to a [`Query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// A single record, e.g. the row an insert produced.
    Row(Record),
    /// Zero or more records, in insertion order.
    Rows(Vec<Record>),
    /// A row count.
    Count(u64),
    /// Acknowledgement without a payload.
    Done,
}

impl QueryOutput {
    pub fn into_row(self) -> Option<Record> {
        match self {
            QueryOutput::Row(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Record>> {
        match self {
            QueryOutput::Rows(records) => Some(records),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            QueryOutput::Count(count) => Some(*count),
            _ => None,
        }
    }
}
